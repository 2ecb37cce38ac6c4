use std::time::Duration;

use thiserror::Error;

use crate::audio::track::TenantId;

/// Errores visibles para quien invoca al controlador de colas.
///
/// Ninguno es fatal: todos se recuperan en el borde del controlador y se
/// convierten en una respuesta para el usuario. `PlaybackError` nunca se
/// devuelve desde una operación; se registra y se trata como fin de pista.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("no se pudo resolver `{locator}`: {reason}")]
    ResolutionFailed { locator: String, reason: String },

    #[error("no se pudo conectar al canal de voz en {tenant}: {reason}")]
    ConnectionFailed { tenant: TenantId, reason: String },

    #[error("no hay ninguna pista reproduciéndose en {0}")]
    NoActiveTrack(TenantId),

    #[error("el bot no está conectado en {0}")]
    NotConnected(TenantId),

    #[error("error de reproducción en {tenant}: {reason}")]
    PlaybackError { tenant: TenantId, reason: String },
}

impl QueueError {
    pub fn resolution(locator: impl Into<String>, reason: impl ToString) -> Self {
        Self::ResolutionFailed {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }

    pub fn connection(tenant: TenantId, reason: impl ToString) -> Self {
        Self::ConnectionFailed {
            tenant,
            reason: reason.to_string(),
        }
    }

    /// Texto corto para mostrar en Discord
    pub fn user_message(&self) -> &'static str {
        match self {
            QueueError::ResolutionFailed { .. } => {
                "No se pudo obtener la canción. Revisa la URL e inténtalo de nuevo."
            }
            QueueError::ConnectionFailed { .. } => "No se pudo conectar al canal de voz.",
            QueueError::NoActiveTrack(_) => "No hay ninguna canción reproduciéndose.",
            QueueError::NotConnected(_) => "El bot no está en ningún canal de voz.",
            QueueError::PlaybackError { .. } => "Error durante la reproducción.",
        }
    }
}

/// Fallos del resolver externo (yt-dlp o similar).
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("locator vacío")]
    EmptyLocator,

    #[error("no se encontraron resultados")]
    NoResults,

    #[error("tiempo de espera agotado tras {0:?}")]
    Timeout(Duration),

    #[error("fallo al ejecutar el resolver: {0}")]
    Process(#[from] std::io::Error),

    #[error("el resolver terminó con error: {0}")]
    Failed(String),

    #[error("respuesta inválida del resolver: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("la respuesta no incluye {0}")]
    MissingField(&'static str),
}

/// Fallos del transporte de voz.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no hay sesión de voz para {0}")]
    NoSession(TenantId),

    #[error("fallo al unirse al canal: {0}")]
    Join(String),

    #[error("fallo al iniciar la reproducción: {0}")]
    Play(String),

    #[error("fallo al controlar la pista: {0}")]
    Control(String),

    #[error("tiempo de espera agotado tras {0:?}")]
    Timeout(Duration),
}
