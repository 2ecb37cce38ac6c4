use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton},
};

/// IDs personalizados para los botones
pub mod button_ids {
    pub const SKIP: &str = "jukebox_skip";
    pub const STOP: &str = "jukebox_stop";
    pub const QUEUE: &str = "jukebox_queue";
}

/// Controles que acompañan al anuncio de "Reproduciendo Ahora".
pub struct PlayerControls;

impl PlayerControls {
    pub fn create(has_queue: bool) -> Vec<CreateActionRow> {
        let skip_btn = CreateButton::new(button_ids::SKIP)
            .emoji('⏭')
            .style(ButtonStyle::Primary);

        let stop_btn = CreateButton::new(button_ids::STOP)
            .emoji('⏹')
            .style(ButtonStyle::Danger);

        let queue_btn = CreateButton::new(button_ids::QUEUE)
            .label("Cola")
            .emoji('📋')
            .style(ButtonStyle::Secondary)
            .disabled(!has_queue);

        vec![CreateActionRow::Buttons(vec![skip_btn, stop_btn, queue_btn])]
    }
}
