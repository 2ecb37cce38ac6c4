use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod storage;
mod ui;

use crate::audio::{controller::QueueController, player::SongbirdTransport};
use crate::bot::JukeboxBot;
use crate::config::{Config, PlaybackMode};
use crate::sources::YtDlpResolver;
use crate::storage::SubscriptionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guild_jukebox=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Guild Jukebox v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    info!("{}", config.summary());
    let config = Arc::new(config);

    // Suscripciones en JSON
    let subscriptions = Arc::new(SubscriptionStore::open(config.subscriptions_path()).await?);

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    // Voz y resolución
    let songbird = Songbird::serenity();
    let transport = Arc::new(SongbirdTransport::new(
        songbird.clone(),
        reqwest::Client::new(),
        config.default_volume,
    ));
    let resolver = YtDlpResolver::new(
        config.ytdlp_path.clone(),
        config.playback_mode,
        config.download_dir.clone(),
        config.max_concurrent_resolves,
    );
    let controller = QueueController::start(resolver, transport, config.controller_config());

    // Crear handler del bot
    let handler = JukeboxBot::new(config.clone(), controller.clone(), subscriptions);

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Error al registrar Ctrl+C");
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        controller.shutdown().await;
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check(config: &Config) -> Result<()> {
    // Verificar dependencias críticas
    let yt_dlp = async_process::Command::new(&config.ytdlp_path)
        .arg("--version")
        .output()
        .await?;

    // ffmpeg solo se usa para extraer audio en modo download
    let ffmpeg_ok = match config.playback_mode {
        PlaybackMode::Download => async_process::Command::new("ffmpeg")
            .arg("-version")
            .output()
            .await?
            .status
            .success(),
        PlaybackMode::Stream => true,
    };

    if yt_dlp.status.success() && ffmpeg_ok {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes");
    }
}
