use tokio::sync::broadcast;
use tracing::debug;

use super::track::TenantId;

/// Notificaciones que el controlador publica para la capa de Discord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Queued {
        tenant: TenantId,
        position: usize,
        title: String,
    },
    NowPlaying {
        tenant: TenantId,
        title: String,
    },
    Idle {
        tenant: TenantId,
    },
    Stopped {
        tenant: TenantId,
    },
}

impl QueueEvent {
    pub fn tenant(&self) -> TenantId {
        match self {
            QueueEvent::Queued { tenant, .. }
            | QueueEvent::NowPlaying { tenant, .. }
            | QueueEvent::Idle { tenant }
            | QueueEvent::Stopped { tenant } => *tenant,
        }
    }
}

/// Difunde [`QueueEvent`] a todos los suscriptores.
#[derive(Clone)]
pub struct QueueNotifier {
    tx: broadcast::Sender<QueueEvent>,
}

impl QueueNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publica un evento, aunque nadie esté escuchando
    pub fn publish(&self, event: QueueEvent) {
        if let Ok(count) = self.tx.send(event) {
            debug!("Evento de cola enviado a {} suscriptores", count);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }
}
