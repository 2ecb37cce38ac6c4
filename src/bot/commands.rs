use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        queue_command(),
        skip_command(),
        stop_command(),
        nowplaying_command(),
        subscription_command(),
        grant_command(),
    ]
}

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Reproduce una canción o la agrega a la cola")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "URL o término de búsqueda",
            )
            .required(true),
        )
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue")
        .description("Muestra la cola de reproducción")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "page", "Número de página")
                .min_int_value(1),
        )
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Salta a la siguiente canción")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Detiene la música, limpia la cola y sale del canal")
}

fn nowplaying_command() -> CreateCommand {
    CreateCommand::new("nowplaying").description("Muestra la canción actual")
}

// Suscripciones

fn subscription_command() -> CreateCommand {
    CreateCommand::new("subscription").description("Muestra el estado de tu suscripción")
}

fn grant_command() -> CreateCommand {
    CreateCommand::new("grant")
        .description("Otorga una suscripción a un usuario (solo admin)")
        .add_option(
            CreateCommandOption::new(CommandOptionType::User, "user", "Usuario").required(true),
        )
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "days", "Días de suscripción")
                .min_int_value(1),
        )
}
