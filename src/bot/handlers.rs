use anyhow::Result;
use chrono::Utc;
use serenity::{
    builder::{
        CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
        EditInteractionResponse,
    },
    model::{
        application::{CommandInteraction, ComponentInteraction},
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};

use crate::{
    audio::{
        session::SessionState,
        track::{ChannelRef, TenantId},
    },
    bot::JukeboxBot,
    error::QueueError,
    ui::{buttons::button_ids, embeds},
};

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &JukeboxBot) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, &command, guild_id, bot).await?,
        "queue" => handle_queue(ctx, &command, guild_id, bot).await?,
        "skip" => handle_skip(ctx, &command, guild_id, bot).await?,
        "stop" => handle_stop(ctx, &command, guild_id, bot).await?,
        "nowplaying" => handle_nowplaying(ctx, &command, guild_id, bot).await?,
        "subscription" => handle_subscription(ctx, &command, bot).await?,
        "grant" => handle_grant(ctx, &command, bot).await?,
        _ => {
            respond(ctx, &command, embeds::create_error_embed("Error", "Comando no reconocido"), true).await?;
        }
    }

    Ok(())
}

/// Maneja los botones del anuncio de "Reproduciendo Ahora"
pub async fn handle_component(ctx: &Context, component: ComponentInteraction, bot: &JukeboxBot) -> Result<()> {
    let guild_id = component
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Componente usado fuera de un servidor"))?;
    let tenant = TenantId::from(guild_id);

    info!(
        "🔘 Botón {} presionado por {} en guild {}",
        component.data.custom_id, component.user.name, guild_id
    );

    let embed = match component.data.custom_id.as_str() {
        button_ids::SKIP => match bot.controller.skip(tenant).await {
            Ok(()) => embeds::create_success_embed("Saltado", "⏭️ Pasando a la siguiente canción"),
            Err(e) => queue_error_embed(&e),
        },
        button_ids::STOP => match bot.controller.stop(tenant).await {
            Ok(()) => embeds::create_success_embed("Detenido", "⏹️ Cola limpiada y canal abandonado"),
            Err(e) => queue_error_embed(&e),
        },
        button_ids::QUEUE => {
            let current = bot.controller.now_playing(tenant).await;
            embeds::create_queue_embed(current.as_ref(), &bot.controller.inspect(tenant), 1)
        }
        _ => embeds::create_error_embed("Error", "Acción no reconocida"),
    };

    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embed).ephemeral(true),
            ),
        )
        .await?;

    Ok(())
}

// Handlers específicos para cada comando

async fn handle_play(ctx: &Context, command: &CommandInteraction, guild_id: GuildId, bot: &JukeboxBot) -> Result<()> {
    let query = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str())
        .ok_or_else(|| anyhow::anyhow!("Query no proporcionado"))?;

    if !bot.has_access(command.user.id).await {
        let embed = embeds::create_error_embed(
            "Suscripción requerida",
            "Necesitas una suscripción activa para reproducir música. Usa `/subscription` para ver tu estado.",
        );
        return respond(ctx, command, embed, true).await;
    }

    let Some(voice_channel_id) = get_user_voice_channel(ctx, guild_id, command.user.id) else {
        let embed = embeds::create_error_embed("Sin canal de voz", "Debes estar en un canal de voz");
        return respond(ctx, command, embed, true).await;
    };

    // Defer la respuesta ya que la resolución puede tardar
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let tenant = TenantId::from(guild_id);
    bot.remember_text_channel(tenant, command.channel_id);

    let embed = match bot
        .controller
        .enqueue(tenant, ChannelRef::from(voice_channel_id), query)
        .await
    {
        Ok(enqueued) => {
            embeds::create_track_added_embed(&enqueued.track, enqueued.position, enqueued.playing_now)
        }
        Err(e) => {
            warn!("❌ /play falló en {}: {}", tenant, e);
            queue_error_embed(&e)
        }
    };

    command
        .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
        .await?;

    Ok(())
}

async fn handle_skip(ctx: &Context, command: &CommandInteraction, guild_id: GuildId, bot: &JukeboxBot) -> Result<()> {
    let tenant = TenantId::from(guild_id);
    bot.remember_text_channel(tenant, command.channel_id);

    let embed = match bot.controller.skip(tenant).await {
        Ok(()) => embeds::create_success_embed("Saltado", "⏭️ Pasando a la siguiente canción"),
        Err(e) => queue_error_embed(&e),
    };

    respond(ctx, command, embed, false).await
}

async fn handle_stop(ctx: &Context, command: &CommandInteraction, guild_id: GuildId, bot: &JukeboxBot) -> Result<()> {
    let tenant = TenantId::from(guild_id);

    let embed = match bot.controller.stop(tenant).await {
        Ok(()) => embeds::create_success_embed("Detenido", "⏹️ Cola limpiada y canal abandonado"),
        Err(e) => queue_error_embed(&e),
    };

    respond(ctx, command, embed, false).await
}

async fn handle_queue(ctx: &Context, command: &CommandInteraction, guild_id: GuildId, bot: &JukeboxBot) -> Result<()> {
    let tenant = TenantId::from(guild_id);
    let page = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "page")
        .and_then(|opt| opt.value.as_i64())
        .map_or(1, |page| page.max(1) as usize);

    let entries = bot.controller.inspect(tenant);
    let current = bot.controller.now_playing(tenant).await;
    let embed = embeds::create_queue_embed(current.as_ref(), &entries, page);

    respond(ctx, command, embed, false).await
}

async fn handle_nowplaying(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    bot: &JukeboxBot,
) -> Result<()> {
    let tenant = TenantId::from(guild_id);

    let snapshot = bot.controller.session(tenant).await;
    let embed = match (snapshot.state(), snapshot.current_track.as_ref()) {
        (SessionState::Playing, Some(track)) => embeds::create_now_playing_embed(track.title()),
        (SessionState::Idle, _) => embeds::create_info_embed(
            "En espera",
            "Conectado, pero no hay nada sonando. Usa `/play` para agregar música.",
        ),
        (SessionState::Disconnected, _) | (SessionState::Playing, None) => {
            embeds::create_info_embed("Nada sonando", "El bot no está en ningún canal de voz.")
        }
    };

    respond(ctx, command, embed, false).await
}

async fn handle_subscription(ctx: &Context, command: &CommandInteraction, bot: &JukeboxBot) -> Result<()> {
    // El administrador ve todas las suscripciones
    let embed = if bot.is_admin(command.user.id) {
        embeds::create_subscriber_list_embed(&bot.subscriptions.list().await, Utc::now())
    } else {
        let subscription = bot.subscriptions.get(command.user.id.get()).await;
        embeds::create_subscription_embed(subscription.as_ref(), Utc::now())
    };

    respond(ctx, command, embed, true).await
}

async fn handle_grant(ctx: &Context, command: &CommandInteraction, bot: &JukeboxBot) -> Result<()> {
    if !bot.is_admin(command.user.id) {
        let embed = embeds::create_error_embed("Sin permiso", "Solo el administrador puede usar `/grant`.");
        return respond(ctx, command, embed, true).await;
    }

    let user_id = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "user")
        .and_then(|opt| opt.value.as_user_id())
        .ok_or_else(|| anyhow::anyhow!("Usuario no proporcionado"))?;
    let days = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "days")
        .and_then(|opt| opt.value.as_i64())
        .unwrap_or(bot.config.subscription_days)
        .max(1);

    let subscription = bot.subscriptions.add_subscription(user_id.get(), days).await?;
    info!("💳 {} otorgó {} días a {}", command.user.name, days, user_id);

    let embed = embeds::create_success_embed(
        "Suscripción otorgada",
        &format!(
            "<@{}> tiene acceso hasta <t:{}:f>",
            user_id,
            subscription.expires_at.timestamp()
        ),
    );

    respond(ctx, command, embed, true).await
}

// Funciones auxiliares

async fn respond(ctx: &Context, command: &CommandInteraction, embed: CreateEmbed, ephemeral: bool) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .ephemeral(ephemeral),
            ),
        )
        .await?;

    Ok(())
}

/// Título y descripción que ve el usuario para cada error de cola
fn queue_error_text(error: &QueueError) -> (&'static str, String) {
    let title = match error {
        QueueError::ResolutionFailed { .. } => "Canción no encontrada",
        QueueError::ConnectionFailed { .. } => "Error de conexión",
        QueueError::NoActiveTrack(_) => "Nada que saltar",
        QueueError::NotConnected(_) => "No conectado",
        QueueError::PlaybackError { .. } => "Error de reproducción",
    };

    let description = match error {
        QueueError::ResolutionFailed { reason, .. } | QueueError::ConnectionFailed { reason, .. } => {
            format!("{}\n```{}```", error.user_message(), reason)
        }
        _ => error.user_message().to_string(),
    };

    (title, description)
}

fn queue_error_embed(error: &QueueError) -> CreateEmbed {
    let (title, description) = queue_error_text(error);
    embeds::create_error_embed(title, &description)
}

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolution_errors_show_the_reason() {
        let error = QueueError::resolution("https://bad", "HTTP Error 404");

        let (title, description) = queue_error_text(&error);

        assert_eq!(title, "Canción no encontrada");
        assert!(description.contains("HTTP Error 404"));
    }

    #[test]
    fn state_errors_use_the_short_message() {
        let (title, description) = queue_error_text(&QueueError::NotConnected(TenantId(1)));

        assert_eq!(title, "No conectado");
        assert_eq!(description, "El bot no está en ningún canal de voz.");
    }
}
