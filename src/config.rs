use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::audio::controller::ControllerConfig;

/// Cómo se entrega el audio resuelto al transporte de voz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// URL directa de audio, reproducida por HTTP
    Stream,
    /// Archivo mp3 descargado en `download_dir`
    Download,
}

impl PlaybackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackMode::Stream => "stream",
            PlaybackMode::Download => "download",
        }
    }
}

impl FromStr for PlaybackMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" => Ok(PlaybackMode::Stream),
            "download" => Ok(PlaybackMode::Download),
            other => anyhow::bail!("PLAYBACK_MODE must be `stream` or `download`, got: {}", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Audio
    pub default_volume: f32,
    pub playback_mode: PlaybackMode,

    // Resolución
    pub ytdlp_path: String,
    pub max_concurrent_resolves: usize,
    #[serde(with = "duration_text")]
    pub resolve_timeout: Duration,
    #[serde(with = "duration_text")]
    pub connect_timeout: Duration,

    // Paths
    pub data_dir: PathBuf,
    pub download_dir: PathBuf,

    // Suscripciones
    pub require_subscription: bool,
    pub subscription_days: i64,
    pub admin_user_id: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN no definido")?,
            application_id: std::env::var("APPLICATION_ID")
                .context("APPLICATION_ID no definido")?
                .parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Audio
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,
            playback_mode: std::env::var("PLAYBACK_MODE")
                .unwrap_or_else(|_| "stream".to_string())
                .parse()?,

            // Resolución
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
            max_concurrent_resolves: std::env::var("MAX_CONCURRENT_RESOLVES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            resolve_timeout: humantime::parse_duration(
                &std::env::var("RESOLVE_TIMEOUT").unwrap_or_else(|_| "30s".to_string()),
            )
            .context("RESOLVE_TIMEOUT inválido")?,
            connect_timeout: humantime::parse_duration(
                &std::env::var("CONNECT_TIMEOUT").unwrap_or_else(|_| "10s".to_string()),
            )
            .context("CONNECT_TIMEOUT inválido")?,

            // Paths
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "/app/data".to_string())
                .into(),
            download_dir: std::env::var("DOWNLOAD_DIR")
                .unwrap_or_else(|_| "/app/cache".to_string())
                .into(),

            // Suscripciones
            require_subscription: std::env::var("REQUIRE_SUBSCRIPTION")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            subscription_days: std::env::var("SUBSCRIPTION_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            admin_user_id: std::env::var("ADMIN_USER_ID").ok().and_then(|s| s.parse().ok()),
        };

        config.validate()?;

        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("no se pudo crear {}", config.data_dir.display()))?;
        if config.playback_mode == PlaybackMode::Download {
            std::fs::create_dir_all(&config.download_dir)
                .with_context(|| format!("no se pudo crear {}", config.download_dir.display()))?;
        }

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Volume must be between 0.0 and 2.0
    /// - Timeouts must be non-zero
    /// - At least one yt-dlp process must be allowed
    /// - Subscriptions must last at least one day
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.default_volume) {
            anyhow::bail!("Default volume must be between 0.0 and 2.0, got: {}", self.default_volume);
        }

        if self.resolve_timeout.is_zero() {
            anyhow::bail!("RESOLVE_TIMEOUT must be greater than 0");
        }

        if self.connect_timeout.is_zero() {
            anyhow::bail!("CONNECT_TIMEOUT must be greater than 0");
        }

        if self.max_concurrent_resolves == 0 {
            anyhow::bail!("MAX_CONCURRENT_RESOLVES must be greater than 0");
        }

        if self.subscription_days < 1 {
            anyhow::bail!("SUBSCRIPTION_DAYS must be at least 1, got: {}", self.subscription_days);
        }

        if self.require_subscription && self.admin_user_id.is_none() {
            tracing::warn!("⚠️ REQUIRE_SUBSCRIPTION activo sin ADMIN_USER_ID: nadie podrá usar /grant");
        }

        Ok(())
    }

    /// Parte de la configuración que consume el controlador de colas
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            resolve_timeout: self.resolve_timeout,
            connect_timeout: self.connect_timeout,
            ..ControllerConfig::default()
        }
    }

    pub fn subscriptions_path(&self) -> PathBuf {
        self.data_dir.join("subscriptions.json")
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Never includes the Discord token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Audio: {}% vol, modo {}\n  \
            Resolución: {} ({} procesos), timeout {}\n  \
            Conexión: timeout {}\n  \
            Suscripción: requerida={}, {} días por /grant",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            (self.default_volume * 100.0) as u32,
            self.playback_mode.as_str(),
            self.ytdlp_path,
            self.max_concurrent_resolves,
            humantime::format_duration(self.resolve_timeout),
            humantime::format_duration(self.connect_timeout),
            self.require_subscription,
            self.subscription_days,
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,

            default_volume: 0.5,
            playback_mode: PlaybackMode::Stream,

            ytdlp_path: "yt-dlp".to_string(),
            max_concurrent_resolves: 3,
            resolve_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),

            data_dir: "/app/data".into(),
            download_dir: "/app/cache".into(),

            require_subscription: false,
            subscription_days: 30,
            admin_user_id: None,
        }
    }
}

/// Serializa `Duration` como texto humantime ("30s", "1m 30s")
mod duration_text {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn playback_mode_parses_case_insensitively() {
        assert_eq!("stream".parse::<PlaybackMode>().unwrap(), PlaybackMode::Stream);
        assert_eq!(" Download ".parse::<PlaybackMode>().unwrap(), PlaybackMode::Download);
        assert!("lavalink".parse::<PlaybackMode>().is_err());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn volume_out_of_range_is_rejected() {
        let config = Config {
            default_volume: 3.0,
            ..Config::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let config = Config {
            connect_timeout: Duration::ZERO,
            ..Config::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn controller_config_carries_timeouts() {
        let config = Config {
            resolve_timeout: Duration::from_secs(45),
            connect_timeout: Duration::from_secs(5),
            ..Config::default()
        };

        let controller = config.controller_config();

        assert_eq!(controller.resolve_timeout, Duration::from_secs(45));
        assert_eq!(controller.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn summary_never_contains_the_token() {
        let config = Config {
            discord_token: "super-secret-token".to_string(),
            ..Config::default()
        };

        let summary = config.summary();

        assert!(!summary.contains("super-secret-token"));
        assert!(summary.contains("modo stream"));
        assert!(summary.contains("30s"));
    }

    #[test]
    fn config_serializes_durations_as_text() {
        let json = serde_json::to_value(Config::default()).unwrap();

        assert_eq!(json["resolve_timeout"], "30s");
        assert_eq!(json["playback_mode"], "stream");
    }
}
