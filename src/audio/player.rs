use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{File, HttpRequest, Input},
    tracks::{PlayMode, TrackHandle},
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    track::{ChannelRef, SourceRef, TenantId},
    transport::{SessionHandle, TrackEndNotifier, VoiceTransport},
};
use crate::error::TransportError;

/// Transporte de voz sobre songbird.
///
/// Guarda el `TrackHandle` de la pista actual de cada guild para poder
/// detenerla; el fin de pista vuelve al controlador a través del
/// [`TrackEndNotifier`] registrado como evento de songbird.
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    http: Client,
    volume: f32,
    current_tracks: DashMap<TenantId, TrackHandle>,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>, http: Client, volume: f32) -> Self {
        Self {
            manager,
            http,
            volume: volume.clamp(0.0, 2.0),
            current_tracks: DashMap::new(),
        }
    }

    fn input_for(&self, source: &SourceRef) -> Input {
        match source {
            SourceRef::Streamed(url) => HttpRequest::new(self.http.clone(), url.clone()).into(),
            SourceRef::Downloaded(path) => File::new(path.clone()).into(),
        }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn connect(&self, tenant: TenantId, channel: ChannelRef) -> Result<SessionHandle, TransportError> {
        let guild_id: GuildId = tenant.into();
        let channel_id: ChannelId = channel.into();

        self.manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| TransportError::Join(e.to_string()))?;

        debug!("Songbird unido a {} en {}", channel_id, tenant);
        Ok(SessionHandle::new(tenant, channel))
    }

    async fn play(
        &self,
        session: &SessionHandle,
        source: &SourceRef,
        notifier: TrackEndNotifier,
    ) -> Result<(), TransportError> {
        let call = self
            .manager
            .get(GuildId::from(session.tenant))
            .ok_or(TransportError::NoSession(session.tenant))?;

        let input = self.input_for(source);
        let track_handle = {
            let mut handler = call.lock().await;
            handler.play_input(input)
        };

        if let Err(e) = track_handle.set_volume(self.volume) {
            warn!("⚠️ No se pudo ajustar el volumen en {}: {}", session.tenant, e);
        }

        // End y Error comparten notifier: solo el primero llega al controlador
        for event in [TrackEvent::End, TrackEvent::Error] {
            if let Err(e) = track_handle.add_event(Event::Track(event), TrackEndRelay(notifier.clone())) {
                if let Err(stop_err) = track_handle.stop() {
                    debug!("Stop de mejor esfuerzo falló en {}: {}", session.tenant, stop_err);
                }
                return Err(TransportError::Play(format!("no se pudo registrar el evento: {}", e)));
            }
        }

        info!("▶️ {} ({}) en {}", source.kind(), notifier.playback().0, session.tenant);
        self.current_tracks.insert(session.tenant, track_handle);
        Ok(())
    }

    async fn stop(&self, session: &SessionHandle) -> Result<(), TransportError> {
        if let Some((_, track)) = self.current_tracks.remove(&session.tenant) {
            track.stop().map_err(|e| TransportError::Control(e.to_string()))?;
        }
        Ok(())
    }

    async fn disconnect(&self, session: &SessionHandle) -> Result<(), TransportError> {
        self.current_tracks.remove(&session.tenant);

        self.manager
            .remove(GuildId::from(session.tenant))
            .await
            .map_err(|e| TransportError::Control(e.to_string()))?;

        info!("👋 Desconectado del canal de voz en {}", session.tenant);
        Ok(())
    }
}

/// Reenvía los eventos de songbird al controlador
struct TrackEndRelay(TrackEndNotifier);

#[async_trait]
impl VoiceEventHandler for TrackEndRelay {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let failure = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(e.to_string()),
                _ => None,
            }),
            _ => None,
        };

        match failure {
            Some(reason) => self.0.failed(reason),
            None => {
                debug!("Track terminado en {}", self.0.tenant());
                self.0.finished();
            }
        }

        // Quitar el handler después del primer disparo
        Some(Event::Cancel)
    }
}
