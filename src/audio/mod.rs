//! # Audio Module
//!
//! Per-guild playback queues and the voice transport that plays them.
//!
//! ## Architecture
//!
//! ### [`controller`] - Queue Controller
//! - Owns one [`queue::TenantQueue`] and at most one
//!   [`session::PlaybackSession`] per guild
//! - Serializes every mutation of a guild behind that guild's worker lock
//! - Advances the queue when the transport reports a track end
//!
//! ### [`queue`] - Queue Management
//! - Strict FIFO of resolved tracks, current track excluded
//! - 1-based positions, duplicates allowed
//!
//! ### [`transport`] - Voice Transport Contract
//! - [`transport::VoiceTransport`] is the seam between the controller and
//!   Discord voice
//! - [`player::SongbirdTransport`] implements it on top of songbird
//!
//! ### [`events`] - Observers
//! - Broadcast of queue events (queued, now playing, idle, stopped) used
//!   for announcements in text channels
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! # use guild_jukebox::audio::{controller::{ControllerConfig, QueueController}, track::{ChannelRef, TenantId}};
//! # async fn example(resolver: impl guild_jukebox::sources::TrackResolver, transport: std::sync::Arc<impl guild_jukebox::audio::transport::VoiceTransport>) -> anyhow::Result<()> {
//! let controller = QueueController::start(resolver, transport, ControllerConfig::default());
//! let guild = TenantId(123456789);
//!
//! controller.enqueue(guild, ChannelRef(987654321), "never gonna give you up").await?;
//! controller.skip(guild).await?;
//! controller.stop(guild).await?;
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod events;
pub mod player;
pub mod queue;
pub mod session;
pub mod track;
pub mod transport;

#[cfg(test)]
mod testing;
