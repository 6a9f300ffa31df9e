pub mod book;
pub mod directory;

pub use book::{partition_key, CharacterBook, SavedNote, NO_CHARACTER_KEY};
pub use directory::{CharacterDirectory, HostCharacter};
