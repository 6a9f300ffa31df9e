pub mod debounce;
pub mod schema;
pub mod store;

pub use schema::{CharacterEntry, Position, Settings, CAPTION_SLOTS};
pub use store::{JsonFileBackend, SettingsBackend, SettingsStore};
