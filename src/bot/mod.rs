//! # Bot Module
//!
//! Discord glue for the jukebox.
//!
//! This module contains:
//! - Slash command registration ([`commands`])
//! - Command and button dispatch into the queue controller ([`handlers`])
//! - Track change announcements in text channels ([`events`])
//!
//! ## Architecture
//!
//! The bot is built around the [`JukeboxBot`] struct which implements
//! Serenity's [`EventHandler`] trait. It owns no playback state of its own:
//! every queue operation goes through the shared [`Jukebox`] controller,
//! keyed by guild.
//!
//! The only per-guild state kept here is the text channel each guild last
//! used a command from, which is where asynchronous announcements
//! ("Reproduciendo Ahora", "Cola terminada") are posted.

use anyhow::Result;
use dashmap::DashMap;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Interaction, Ready, UserId, VoiceState},
    async_trait,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{error, info, warn};

pub mod commands;
pub mod events;
pub mod handlers;

use crate::{
    audio::{controller::QueueController, player::SongbirdTransport, track::TenantId},
    config::Config,
    sources::YtDlpResolver,
    storage::{EntitlementGate, SubscriptionStore},
};

/// Controlador de colas de producción
pub type Jukebox = QueueController<YtDlpResolver, SongbirdTransport>;

/// Main Discord bot handler.
///
/// ## Fields
///
/// - `config`: Bot configuration (tokens, timeouts, subscription policy)
/// - `controller`: Per-guild queue controller
/// - `subscriptions`: Persistent subscription store used by `/subscription` and `/grant`
/// - `gate`: Entitlement check run before `/play`, only when subscriptions are required
/// - `announce_channels`: Last text channel commanded from, per guild
pub struct JukeboxBot {
    config: Arc<Config>,
    pub controller: Arc<Jukebox>,
    pub subscriptions: Arc<SubscriptionStore>,
    gate: Option<Arc<dyn EntitlementGate>>,
    announce_channels: Arc<DashMap<TenantId, ChannelId>>,
    announcer_started: AtomicBool,
}

impl JukeboxBot {
    pub fn new(config: Arc<Config>, controller: Arc<Jukebox>, subscriptions: Arc<SubscriptionStore>) -> Self {
        let gate = config
            .require_subscription
            .then(|| subscriptions.clone() as Arc<dyn EntitlementGate>);

        Self {
            config,
            controller,
            subscriptions,
            gate,
            announce_channels: Arc::new(DashMap::new()),
            announcer_started: AtomicBool::new(false),
        }
    }

    /// Registers slash commands with Discord: per guild when `GUILD_ID` is
    /// set, globally otherwise.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");
        info!("🔧 Application ID: {}", self.config.application_id);

        match self.config.guild_id {
            Some(guild_id) => {
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);
                let guild_id = GuildId::new(guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id).await.map_err(|e| {
                    error!("❌ Error registrando comandos de guild: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }

    /// Recuerda dónde anunciar los cambios de pista de la guild
    pub fn remember_text_channel(&self, tenant: TenantId, channel_id: ChannelId) {
        self.announce_channels.insert(tenant, channel_id);
    }

    /// `true` si el usuario puede encolar (siempre, si no se exige suscripción)
    pub async fn has_access(&self, user_id: UserId) -> bool {
        match &self.gate {
            Some(gate) => gate.has_access(user_id.get()).await,
            None => true,
        }
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.config.admin_user_id == Some(user_id.get())
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    /// Called when the bot is ready and connected to Discord.
    ///
    /// Registers the slash commands and, on the first ready only, starts the
    /// announcer task. Ready fires again after every gateway resume.
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        if !self.announcer_started.swap(true, Ordering::SeqCst) {
            tokio::spawn(events::run_announcer(
                ctx.http.clone(),
                self.controller.clone(),
                self.controller.subscribe(),
                self.announce_channels.clone(),
            ));
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command_interaction) => {
                if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                    error!("Error manejando comando: {:?}", e);
                }
            }
            Interaction::Component(component_interaction) => {
                if let Err(e) = handlers::handle_component(&ctx, component_interaction, self).await {
                    error!("Error manejando componente: {:?}", e);
                }
            }
            _ => {}
        }
    }

    /// Cierra la sesión de la guild cuando el bot sale del canal de voz por
    /// fuera de `/stop` (expulsado, canal borrado).
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        if let Some(guild_id) = new.guild_id {
            info!("🔌 Bot desconectado en guild {}", guild_id);
            self.controller.disconnected(TenantId::from(guild_id)).await;
        }
    }
}
