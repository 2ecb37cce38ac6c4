use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tracing::debug;

use super::track::{ChannelRef, SourceRef, TenantId};
use crate::error::TransportError;

/// Identifica una reproducción concreta dentro del proceso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackId(pub u64);

/// Referencia a una conexión de voz establecida.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub tenant: TenantId,
    pub channel: ChannelRef,
}

impl SessionHandle {
    pub fn new(tenant: TenantId, channel: ChannelRef) -> Self {
        Self { tenant, channel }
    }
}

/// Cómo terminó una reproducción.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Fin natural o detenida a la fuerza
    Finished,
    /// El primitivo de reproducción falló a mitad de pista
    Failed(String),
}

/// Evento "pista terminada" que consume el controlador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEnded {
    pub tenant: TenantId,
    pub playback: PlaybackId,
    pub outcome: TrackOutcome,
}

/// Se entrega al transporte junto con cada pista; el transporte lo dispara
/// cuando la pista termina por cualquier motivo. Solo el primer disparo
/// llega al controlador.
#[derive(Debug, Clone)]
pub struct TrackEndNotifier {
    tenant: TenantId,
    playback: PlaybackId,
    tx: mpsc::UnboundedSender<TrackEnded>,
    fired: Arc<AtomicBool>,
}

impl TrackEndNotifier {
    pub(crate) fn new(
        tenant: TenantId,
        playback: PlaybackId,
        tx: mpsc::UnboundedSender<TrackEnded>,
    ) -> Self {
        Self {
            tenant,
            playback,
            tx,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    pub fn playback(&self) -> PlaybackId {
        self.playback
    }

    pub fn finished(&self) {
        self.fire(TrackOutcome::Finished);
    }

    pub fn failed(&self, reason: impl Into<String>) {
        self.fire(TrackOutcome::Failed(reason.into()));
    }

    fn fire(&self, outcome: TrackOutcome) {
        if self.fired.swap(true, Ordering::AcqRel) {
            return;
        }

        let event = TrackEnded {
            tenant: self.tenant,
            playback: self.playback,
            outcome,
        };
        if self.tx.send(event).is_err() {
            debug!("Controlador cerrado, evento de fin descartado para {}", self.tenant);
        }
    }
}

/// Transporte de voz/canal que usa el controlador.
///
/// `play` no espera a que la pista termine: registra el notifier y vuelve.
/// `stop` es una señal de mejor esfuerzo; el transporte puede (o no)
/// disparar el notifier como consecuencia.
#[async_trait]
pub trait VoiceTransport: Send + Sync + 'static {
    async fn connect(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
    ) -> Result<SessionHandle, TransportError>;

    async fn play(
        &self,
        session: &SessionHandle,
        source: &SourceRef,
        notifier: TrackEndNotifier,
    ) -> Result<(), TransportError>;

    async fn stop(&self, session: &SessionHandle) -> Result<(), TransportError>;

    async fn disconnect(&self, session: &SessionHandle) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn notifier_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = TrackEndNotifier::new(TenantId(1), PlaybackId(9), tx);
        let clone = notifier.clone();

        notifier.failed("decoder");
        clone.finished();

        assert_eq!(
            rx.try_recv().ok(),
            Some(TrackEnded {
                tenant: TenantId(1),
                playback: PlaybackId(9),
                outcome: TrackOutcome::Failed("decoder".into()),
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn notifier_survives_closed_controller() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        TrackEndNotifier::new(TenantId(1), PlaybackId(1), tx).finished();
    }
}
