pub mod header;
pub mod help_overlay;
pub mod history_table;
pub mod login_panel;
pub mod playlist_picker;
