use super::{
    track::TrackRequest,
    transport::{PlaybackId, SessionHandle},
};

/// Estado observable de una guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Idle,
    Playing,
}

#[derive(Debug, Clone)]
struct ActivePlayback {
    track: TrackRequest,
    id: PlaybackId,
}

/// Sesión de reproducción de una guild: conectada, y reproduciendo o en
/// espera.
///
/// La pista actual y el flag de reproducción se guardan juntos, así
/// `is_playing()` implica exactamente una pista actual.
#[derive(Debug)]
pub struct PlaybackSession {
    handle: SessionHandle,
    active: Option<ActivePlayback>,
}

impl PlaybackSession {
    pub fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            active: None,
        }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_track(&self) -> Option<&TrackRequest> {
        self.active.as_ref().map(|active| &active.track)
    }

    /// Id de la reproducción en curso, si hay una
    pub fn playback_id(&self) -> Option<PlaybackId> {
        self.active.as_ref().map(|active| active.id)
    }

    pub fn state(&self) -> SessionState {
        if self.is_playing() {
            SessionState::Playing
        } else {
            SessionState::Idle
        }
    }

    /// Idle → Playing
    pub(crate) fn begin(&mut self, track: TrackRequest, id: PlaybackId) {
        debug_assert!(self.active.is_none(), "dos reproducciones simultáneas");
        self.active = Some(ActivePlayback { track, id });
    }

    /// Playing → Idle, solo si `id` es la reproducción en curso.
    ///
    /// Devuelve `false` para eventos de fin atrasados o repetidos.
    pub(crate) fn finish(&mut self, id: PlaybackId) -> bool {
        match &self.active {
            Some(active) if active.id == id => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connected: true,
            current_track: self.current_track().cloned(),
            is_playing: self.is_playing(),
        }
    }
}

/// Copia del estado de una sesión para quien llama desde fuera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub connected: bool,
    pub current_track: Option<TrackRequest>,
    pub is_playing: bool,
}

impl SessionSnapshot {
    /// Guild sin sesión de voz
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            current_track: None,
            is_playing: false,
        }
    }

    pub fn state(&self) -> SessionState {
        match (self.connected, self.is_playing) {
            (false, _) => SessionState::Disconnected,
            (true, false) => SessionState::Idle,
            (true, true) => SessionState::Playing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::{ChannelRef, ResolvedTrack, SourceRef, TenantId};
    use pretty_assertions::assert_eq;

    fn session() -> PlaybackSession {
        PlaybackSession::new(SessionHandle::new(TenantId(7), ChannelRef(70)))
    }

    fn request(title: &str) -> TrackRequest {
        TrackRequest::new(
            ResolvedTrack::new(title, SourceRef::Streamed("https://cdn/x".into())),
            0,
        )
    }

    #[test]
    fn fresh_session_is_idle() {
        let session = session();

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.current_track().is_none());
        assert!(session.playback_id().is_none());
    }

    #[test]
    fn finish_only_matches_current_playback() {
        let mut session = session();
        session.begin(request("A"), PlaybackId(1));

        assert!(!session.finish(PlaybackId(0)));
        assert_eq!(session.state(), SessionState::Playing);

        assert!(session.finish(PlaybackId(1)));
        assert_eq!(session.state(), SessionState::Idle);

        // Un segundo fin para la misma reproducción se ignora
        assert!(!session.finish(PlaybackId(1)));
    }

    #[test]
    fn snapshot_reflects_current_track() {
        let mut session = session();
        session.begin(request("A"), PlaybackId(3));

        let snapshot = session.snapshot();

        assert!(snapshot.is_playing);
        assert_eq!(snapshot.current_track.as_ref().map(|t| t.title().to_string()), Some("A".into()));
        assert_eq!(snapshot.state(), SessionState::Playing);
    }

    #[test]
    fn disconnected_snapshot_has_no_track() {
        let snapshot = SessionSnapshot::disconnected();

        assert_eq!(snapshot.state(), SessionState::Disconnected);
        assert_eq!(snapshot.current_track, None);
    }
}
