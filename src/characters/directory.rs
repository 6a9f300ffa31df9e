use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What the host knows about one character card.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HostCharacter {
    pub name: String,
    pub avatar: Option<String>,
}

/// Host-provided character directory, keyed by character identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CharacterDirectory {
    characters: HashMap<String, HostCharacter>,
}

impl CharacterDirectory {
    pub fn get(&self, id: &str) -> Option<&HostCharacter> {
        self.characters.get(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, character: HostCharacter) {
        self.characters.insert(id.into(), character);
    }

    pub fn avatar(&self, id: &str) -> Option<&str> {
        self.get(id)
            .and_then(|c| c.avatar.as_deref())
            .filter(|avatar| !avatar.trim().is_empty())
    }

    /// Card name when the host has one, otherwise a shortened identifier.
    pub fn display_name(&self, id: &str) -> String {
        match self.get(id) {
            Some(character) if !character.name.trim().is_empty() => character.name.clone(),
            _ => {
                let short: String = id.chars().take(8).collect();
                format!("(ID: {short}...)")
            }
        }
    }
}

impl FromIterator<(String, HostCharacter)> for CharacterDirectory {
    fn from_iter<T: IntoIterator<Item = (String, HostCharacter)>>(iter: T) -> Self {
        Self {
            characters: iter.into_iter().collect(),
        }
    }
}
