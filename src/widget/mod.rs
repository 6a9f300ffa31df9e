//! The floating memo panel: layout, avatars, host lifecycle and user actions.

pub mod avatar;
pub mod commands;
pub mod controller;
pub mod geometry;
pub mod host;
pub mod ui;
pub mod view;

pub use controller::WidgetController;
pub use ui::TauriUi;
