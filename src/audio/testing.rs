//! Dobles de prueba para el controlador: un transporte en memoria y un
//! resolver que devuelve el locator como título.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::Notify;

use super::{
    track::{ChannelRef, ResolvedTrack, SourceRef, TenantId},
    transport::{SessionHandle, TrackEndNotifier, VoiceTransport},
};
use crate::{
    error::{ResolveError, TransportError},
    sources::{Resolved, TrackResolver},
};

/// Fuente que `TitleResolver` produce en modo stream
pub fn track_source(title: &str) -> SourceRef {
    SourceRef::Streamed(format!("https://cdn.test/{title}"))
}

#[derive(Default)]
struct FakeState {
    connects: Vec<(TenantId, ChannelRef)>,
    disconnects: Vec<TenantId>,
    played: HashMap<TenantId, Vec<SourceRef>>,
    current: HashMap<TenantId, TrackEndNotifier>,
    stops: HashMap<TenantId, usize>,
    failing_sources: Vec<SourceRef>,
    fail_connect: bool,
    connect_delay: Option<Duration>,
    stop_delay: Option<Duration>,
    silent_stop: bool,
}

/// Transporte en memoria que registra cada llamada.
///
/// `stop` dispara el notifier de la pista actual, como hace songbird,
/// salvo que se configure `silent_stop`.
#[derive(Default)]
pub struct FakeTransport {
    state: Mutex<FakeState>,
}

impl FakeTransport {
    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        self.state.lock().connect_delay = Some(delay);
    }

    /// `stop` tarda `delay` antes de cortar la pista
    pub fn set_stop_delay(&self, delay: Duration) {
        self.state.lock().stop_delay = Some(delay);
    }

    pub fn fail_play_of(&self, title: &str) {
        self.state.lock().failing_sources.push(track_source(title));
    }

    pub fn silent_stop(&self, silent: bool) {
        self.state.lock().silent_stop = silent;
    }

    pub fn connects(&self) -> Vec<(TenantId, ChannelRef)> {
        self.state.lock().connects.clone()
    }

    pub fn disconnects(&self) -> Vec<TenantId> {
        self.state.lock().disconnects.clone()
    }

    pub fn played(&self, tenant: TenantId) -> Vec<SourceRef> {
        self.state.lock().played.get(&tenant).cloned().unwrap_or_default()
    }

    pub fn stops(&self, tenant: TenantId) -> usize {
        self.state.lock().stops.get(&tenant).copied().unwrap_or(0)
    }

    pub fn current_notifier(&self, tenant: TenantId) -> Option<TrackEndNotifier> {
        self.state.lock().current.get(&tenant).cloned()
    }

    /// Simula el fin natural de la pista actual
    pub fn finish_current(&self, tenant: TenantId) {
        if let Some(notifier) = self.state.lock().current.remove(&tenant) {
            notifier.finished();
        }
    }

    /// Simula un error del decoder a mitad de pista
    pub fn fail_current(&self, tenant: TenantId, reason: &str) {
        if let Some(notifier) = self.state.lock().current.remove(&tenant) {
            notifier.failed(reason);
        }
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    async fn connect(&self, tenant: TenantId, channel: ChannelRef) -> Result<SessionHandle, TransportError> {
        let delay = self.state.lock().connect_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.fail_connect {
            return Err(TransportError::Join("canal lleno".into()));
        }
        state.connects.push((tenant, channel));
        Ok(SessionHandle::new(tenant, channel))
    }

    async fn play(
        &self,
        session: &SessionHandle,
        source: &SourceRef,
        notifier: TrackEndNotifier,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.failing_sources.contains(source) {
            return Err(TransportError::Play("formato no soportado".into()));
        }
        state.played.entry(session.tenant).or_default().push(source.clone());
        state.current.insert(session.tenant, notifier);
        Ok(())
    }

    async fn stop(&self, session: &SessionHandle) -> Result<(), TransportError> {
        let delay = {
            let mut state = self.state.lock();
            *state.stops.entry(session.tenant).or_default() += 1;
            state.stop_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let notifier = {
            let mut state = self.state.lock();
            if state.silent_stop {
                None
            } else {
                state.current.remove(&session.tenant)
            }
        };
        if let Some(notifier) = notifier {
            notifier.finished();
        }
        Ok(())
    }

    async fn disconnect(&self, session: &SessionHandle) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.current.remove(&session.tenant);
        state.disconnects.push(session.tenant);
        Ok(())
    }
}

/// Resolver que usa el locator como título.
///
/// `hold(locator)` hace que esa resolución espere hasta que se notifique
/// el `Notify` devuelto.
#[derive(Default)]
pub struct TitleResolver {
    download_dir: Option<PathBuf>,
    held: Mutex<HashMap<String, Arc<Notify>>>,
}

impl TitleResolver {
    pub fn downloading(dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn hold(&self, locator: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.held.lock().insert(locator.to_string(), gate.clone());
        gate
    }
}

#[async_trait]
impl TrackResolver for TitleResolver {
    async fn resolve(&self, locator: &str) -> Result<Resolved, ResolveError> {
        let gate = self.held.lock().get(locator).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let source = match &self.download_dir {
            Some(dir) => SourceRef::Downloaded(dir.join(format!("{locator}.mp3"))),
            None => track_source(locator),
        };
        Ok(Resolved::Single(ResolvedTrack::new(locator, source)))
    }

    fn name(&self) -> &'static str {
        "title"
    }
}
