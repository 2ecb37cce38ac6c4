//! Embeds and message components shared by the slash commands and the
//! announcer.

pub mod buttons;
pub mod embeds;
