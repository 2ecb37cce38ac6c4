use chrono::{DateTime, Utc};
use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::{
    audio::{queue::QueueEntry, track::TrackRequest},
    storage::Subscription,
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Guild Jukebox";

/// Canciones por página en `/queue`
pub const QUEUE_PAGE_SIZE: usize = 10;

/// Una página completa cabe en el límite de 1024 caracteres de un field
const MAX_TITLE_CHARS: usize = 90;

/// Recorta `title` a `MAX_TITLE_CHARS` caracteres
fn truncate_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let mut short: String = title.chars().take(MAX_TITLE_CHARS - 1).collect();
    short.push('…');
    short
}

/// Crea un embed para mostrar la canción actual
pub fn create_now_playing_embed(title: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(format!("**{}**", title))
        .color(colors::MUSIC_PURPLE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed para mostrar que se agregó una canción
pub fn create_track_added_embed(track: &TrackRequest, position: usize, playing_now: bool) -> CreateEmbed {
    let (title, footer) = if playing_now {
        ("▶️ Reproduciendo", STANDARD_FOOTER)
    } else {
        ("✅ Canción Agregada", "🎵 Se reproducirá cuando termine la actual")
    };

    let mut embed = CreateEmbed::default()
        .title(title)
        .description(format!("**{}**", track.title()))
        .color(colors::SUCCESS_GREEN);

    if !playing_now {
        embed = embed.field("📋 Posición", format!("#{}", position), true);
    }

    embed
        .field("🔗 Fuente", track.source().kind(), true)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(footer))
}

/// Número de páginas para `total` canciones (al menos 1)
pub fn page_count(total: usize) -> usize {
    total.div_ceil(QUEUE_PAGE_SIZE).max(1)
}

/// Líneas de la página `page` (1-based) de la cola
pub fn queue_page_lines(entries: &[QueueEntry], page: usize) -> Vec<String> {
    let page = page.clamp(1, page_count(entries.len()));
    entries
        .iter()
        .skip((page - 1) * QUEUE_PAGE_SIZE)
        .take(QUEUE_PAGE_SIZE)
        .map(|entry| format!("**{}**. {}", entry.position, truncate_title(&entry.title)))
        .collect()
}

/// Crea el embed de `/queue`
pub fn create_queue_embed(current: Option<&TrackRequest>, entries: &[QueueEntry], page: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .color(colors::INFO_BLUE);

    if current.is_none() && entries.is_empty() {
        return embed
            .description("😴 **La cola está vacía**\n\n💡 Usa `/play <canción>` para agregar música")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
            .timestamp(Timestamp::now());
    }

    if let Some(current) = current {
        embed = embed.field("▶️ Reproduciendo", format!("**{}**", truncate_title(current.title())), false);
    }

    let lines = queue_page_lines(entries, page);
    if lines.is_empty() {
        embed = embed.field("Próximas canciones", "Nada más en la cola", false);
    } else {
        embed = embed.field("Próximas canciones", lines.join("\n"), false);
    }

    embed = embed.field("Información", format!("**Total:** {} en cola", entries.len()), false);

    let pages = page_count(entries.len());
    let footer = if pages > 1 {
        format!("Página {} de {} • Guild Jukebox", page.clamp(1, pages), pages)
    } else {
        STANDARD_FOOTER.to_string()
    };

    embed
        .footer(CreateEmbedFooter::new(footer))
        .timestamp(Timestamp::now())
}

/// Crea un embed de suscripción para `/subscription`
pub fn create_subscription_embed(subscription: Option<&Subscription>, now: DateTime<Utc>) -> CreateEmbed {
    let embed = CreateEmbed::default().title("💳 Suscripción");

    let embed = match subscription {
        Some(sub) if sub.is_active_at(now) => embed
            .description(format!(
                "✅ Activa hasta <t:{}:f>",
                sub.expires_at.timestamp()
            ))
            .color(colors::SUCCESS_GREEN),
        Some(sub) => embed
            .description(format!("⌛ Venció el <t:{}:f>", sub.expires_at.timestamp()))
            .color(colors::WARNING_ORANGE),
        None => embed
            .description("No tienes una suscripción activa.")
            .color(colors::NEUTRAL_GRAY),
    };

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Vista de administrador con todas las suscripciones
pub fn create_subscriber_list_embed(subscriptions: &[Subscription], now: DateTime<Utc>) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("💳 Suscripciones")
        .color(colors::INFO_BLUE);

    if subscriptions.is_empty() {
        embed = embed.description("No hay suscripciones registradas.");
    } else {
        let lines: Vec<String> = subscriptions
            .iter()
            .take(25)
            .map(|sub| {
                let status = if sub.is_active_at(now) { "✅" } else { "⌛" };
                format!("{} <@{}> hasta <t:{}:d>", status, sub.user_id, sub.expires_at.timestamp())
            })
            .collect();
        let active = subscriptions.iter().filter(|s| s.is_active_at(now)).count();
        embed = embed
            .description(lines.join("\n"))
            .field("Información", format!("**Activas:** {} de {}", active, subscriptions.len()), false);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de error
pub fn create_error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de éxito
pub fn create_success_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("✅ {}", title))
        .description(description)
        .color(colors::SUCCESS_GREEN)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de información
pub fn create_info_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("ℹ️ {}", title))
        .description(description)
        .color(colors::INFO_BLUE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entries(n: usize) -> Vec<QueueEntry> {
        (1..=n)
            .map(|position| QueueEntry {
                position,
                title: format!("t{position}"),
            })
            .collect()
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(10), 1);
        assert_eq!(page_count(11), 2);
    }

    #[test]
    fn second_page_continues_positions() {
        let lines = queue_page_lines(&entries(12), 2);

        assert_eq!(lines, vec!["**11**. t11", "**12**. t12"]);
    }

    #[test]
    fn long_titles_fit_in_one_field() {
        let long: Vec<QueueEntry> = (1..=QUEUE_PAGE_SIZE)
            .map(|position| QueueEntry {
                position,
                title: "Ñ".repeat(300),
            })
            .collect();

        let lines = queue_page_lines(&long, 1);

        assert!(lines.join("\n").chars().count() <= 1024);
        assert!(lines[0].ends_with('…'));
        assert_eq!(truncate_title("corto"), "corto");
    }

    #[test]
    fn out_of_range_page_is_clamped() {
        assert_eq!(queue_page_lines(&entries(3), 9).len(), 3);
        assert_eq!(queue_page_lines(&entries(3), 0)[0], "**1**. t1");
    }
}
