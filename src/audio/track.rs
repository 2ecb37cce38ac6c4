use serenity::model::id::{ChannelId, GuildId};
use std::{fmt, path::PathBuf};

/// Dominio aislado de reproducción (una guild de Discord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(pub u64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "guild {}", self.0)
    }
}

impl From<GuildId> for TenantId {
    fn from(guild_id: GuildId) -> Self {
        Self(guild_id.get())
    }
}

impl From<TenantId> for GuildId {
    fn from(tenant: TenantId) -> Self {
        GuildId::new(tenant.0)
    }
}

/// Canal de voz al que debe unirse la sesión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelRef(pub u64);

impl From<ChannelId> for ChannelRef {
    fn from(channel_id: ChannelId) -> Self {
        Self(channel_id.get())
    }
}

impl From<ChannelRef> for ChannelId {
    fn from(channel: ChannelRef) -> Self {
        ChannelId::new(channel.0)
    }
}

/// De dónde obtiene el audio el transporte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// URL directa de stream, reproducida sin descargar
    Streamed(String),
    /// Archivo descargado previamente al disco
    Downloaded(PathBuf),
}

impl SourceRef {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceRef::Streamed(_) => "stream",
            SourceRef::Downloaded(_) => "download",
        }
    }
}

/// Resultado de una resolución exitosa, aún sin posición en la cola.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack {
    pub title: String,
    pub source: SourceRef,
}

impl ResolvedTrack {
    pub fn new(title: impl Into<String>, source: SourceRef) -> Self {
        Self {
            title: title.into(),
            source,
        }
    }
}

/// Pista aceptada en la cola de una guild. Inmutable una vez creada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRequest {
    title: String,
    source: SourceRef,
    submitted_order: u64,
}

impl TrackRequest {
    pub(crate) fn new(resolved: ResolvedTrack, submitted_order: u64) -> Self {
        Self {
            title: resolved.title,
            source: resolved.source,
            submitted_order,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn submitted_order(&self) -> u64 {
        self.submitted_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tenant_id_round_trips_through_guild_id() {
        let guild = GuildId::new(42);
        let tenant = TenantId::from(guild);

        assert_eq!(tenant, TenantId(42));
        assert_eq!(GuildId::from(tenant), guild);
        assert_eq!(tenant.to_string(), "guild 42");
    }

    #[test]
    fn source_kind_labels() {
        assert_eq!(SourceRef::Streamed("https://a/b".into()).kind(), "stream");
        assert_eq!(SourceRef::Downloaded("/tmp/a.mp3".into()).kind(), "download");
    }
}
