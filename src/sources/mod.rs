//! # Sources Module
//!
//! Turns a user supplied locator (URL or search term) into a playable
//! [`ResolvedTrack`].
//!
//! - [`TrackResolver`] is the contract for anything that can resolve
//!   locators. The production implementation is [`YtDlpResolver`].
//! - [`ResolverAdapter`] wraps a resolver with a bounded wait and the
//!   single-entry policy: a resolver may answer with a collection
//!   (playlist or search results) but only the first entry is used.

pub mod ytdlp;

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{audio::track::ResolvedTrack, error::{QueueError, ResolveError}};

pub use ytdlp::YtDlpResolver;

/// Respuesta de un resolver: una pista o una colección de pistas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Single(ResolvedTrack),
    Collection(Vec<ResolvedTrack>),
}

/// Trait común para todos los resolvers de pistas
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync + 'static {
    async fn resolve(&self, locator: &str) -> Result<Resolved, ResolveError>;

    /// Nombre del resolver para logs
    fn name(&self) -> &'static str;
}

/// Contrato uniforme `Resolve(locator) → ResolvedTrack | ResolutionFailed`.
pub struct ResolverAdapter<R> {
    inner: R,
    timeout: Duration,
}

impl<R: TrackResolver> ResolverAdapter<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub async fn resolve(&self, locator: &str) -> Result<ResolvedTrack, QueueError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(QueueError::resolution(locator, ResolveError::EmptyLocator));
        }

        debug!("🔍 Resolviendo `{}` con {}", locator, self.inner.name());

        let resolved = match tokio::time::timeout(self.timeout, self.inner.resolve(locator)).await {
            Ok(Ok(resolved)) => resolved,
            Ok(Err(e)) => {
                warn!("❌ {} falló para `{}`: {}", self.inner.name(), locator, e);
                return Err(QueueError::resolution(locator, e));
            }
            Err(_) => {
                warn!("⏰ Timeout resolviendo `{}` tras {:?}", locator, self.timeout);
                return Err(QueueError::resolution(locator, ResolveError::Timeout(self.timeout)));
            }
        };

        let track = match resolved {
            Resolved::Single(track) => track,
            Resolved::Collection(entries) => {
                let total = entries.len();
                // Solo se usa la primera entrada de la colección
                let first = entries
                    .into_iter()
                    .next()
                    .ok_or_else(|| QueueError::resolution(locator, ResolveError::NoResults))?;
                if total > 1 {
                    info!(
                        "📋 `{}` devolvió {} entradas, usando solo la primera: {}",
                        locator, total, first.title
                    );
                }
                first
            }
        };

        Ok(track)
    }
}
