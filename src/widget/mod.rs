pub mod preference_bar;
pub mod status_bar;
pub mod toc_panel;
