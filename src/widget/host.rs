use serde::Deserialize;

use crate::characters::{partition_key, CharacterDirectory};

use super::avatar::ThumbnailUrls;

/// Last known state of the host chat application.
#[derive(Debug, Clone, Default)]
pub struct HostContext {
    pub directory: CharacterDirectory,
    pub current_character: Option<String>,
    pub persona_avatar: Option<String>,
    pub thumbnails: ThumbnailUrls,
}

impl HostContext {
    pub fn current_key(&self) -> String {
        partition_key(self.current_character.as_deref())
    }

    pub fn current_avatar_file(&self) -> Option<&str> {
        self.current_character
            .as_deref()
            .and_then(|id| self.directory.avatar(id))
    }

    pub fn current_name(&self) -> Option<String> {
        let id = self.current_character.as_deref()?;
        self.directory
            .get(id)
            .map(|c| c.name.clone())
            .filter(|name| !name.trim().is_empty())
    }

    pub fn apply(&mut self, sync: HostSync) {
        if let Some(directory) = sync.directory {
            self.directory = directory;
        }
        self.current_character = sync.current_character;
        if let Some(persona) = sync.persona_avatar {
            self.persona_avatar = Some(persona).filter(|p| !p.trim().is_empty());
        }
    }
}

/// Snapshot of host state pushed alongside lifecycle events.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSync {
    #[serde(default)]
    pub directory: Option<CharacterDirectory>,
    #[serde(default)]
    pub current_character: Option<String>,
    #[serde(default)]
    pub persona_avatar: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characters::{HostCharacter, NO_CHARACTER_KEY};

    #[test]
    fn current_key_falls_back_to_sentinel() {
        let mut host = HostContext::default();
        assert_eq!(host.current_key(), NO_CHARACTER_KEY);
        host.current_character = Some("3".into());
        assert_eq!(host.current_key(), "3");
    }

    #[test]
    fn sync_keeps_directory_when_omitted() {
        let mut host = HostContext::default();
        let mut directory = CharacterDirectory::default();
        directory.insert(
            "3",
            HostCharacter {
                name: "Nova".into(),
                avatar: Some("nova.png".into()),
            },
        );
        host.apply(HostSync {
            directory: Some(directory),
            current_character: Some("3".into()),
            persona_avatar: Some("me.png".into()),
        });
        host.apply(HostSync {
            current_character: Some("3".into()),
            ..HostSync::default()
        });

        assert_eq!(host.current_name().as_deref(), Some("Nova"));
        assert_eq!(host.current_avatar_file(), Some("nova.png"));
        assert_eq!(host.persona_avatar.as_deref(), Some("me.png"));
    }
}
