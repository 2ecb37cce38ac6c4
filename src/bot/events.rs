use dashmap::DashMap;
use serenity::{builder::CreateMessage, http::Http, model::id::ChannelId};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::{
    audio::{events::QueueEvent, track::TenantId},
    bot::Jukebox,
    ui::{buttons::PlayerControls, embeds},
};

/// Publica en el último canal de texto usado en cada guild los cambios de
/// pista que ocurren fuera de un comando (fin natural, skip, errores).
pub async fn run_announcer(
    http: Arc<Http>,
    controller: Arc<Jukebox>,
    mut events: broadcast::Receiver<QueueEvent>,
    channels: Arc<DashMap<TenantId, ChannelId>>,
) {
    info!("📣 Anunciador de pistas iniciado");

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(missed)) => {
                warn!("⚠️ Anunciador atrasado, {} eventos perdidos", missed);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let tenant = event.tenant();
        let Some(channel_id) = channels.get(&tenant).map(|c| *c.value()) else {
            debug!("Sin canal de anuncios para {}", tenant);
            continue;
        };

        if matches!(event, QueueEvent::Stopped { .. }) {
            channels.remove(&tenant);
        }

        if let Some(message) = announcement(&event, !controller.inspect(tenant).is_empty()) {
            if let Err(e) = channel_id.send_message(&http, message).await {
                error!("Error al enviar anuncio en {}: {:?}", tenant, e);
            }
        }
    }

    info!("📣 Anunciador de pistas detenido");
}

/// Mensaje para un evento, `None` si el evento no se anuncia
fn announcement(event: &QueueEvent, has_queue: bool) -> Option<CreateMessage> {
    match event {
        QueueEvent::NowPlaying { title, .. } => Some(
            CreateMessage::new()
                .embed(embeds::create_now_playing_embed(title))
                .components(PlayerControls::create(has_queue)),
        ),
        QueueEvent::Idle { .. } => Some(CreateMessage::new().embed(embeds::create_info_embed(
            "Cola terminada",
            "No quedan canciones. Usa `/play` para seguir escuchando.",
        ))),
        // La respuesta del comando ya informa estos casos
        QueueEvent::Queued { .. } | QueueEvent::Stopped { .. } => None,
    }
}
