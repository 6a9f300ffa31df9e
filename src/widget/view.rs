use serde::{Deserialize, Serialize};

use crate::{
    characters::SavedNote,
    settings::{CharacterEntry, Settings},
};

use super::{
    avatar::{resolve_avatar, AvatarSource, ThumbnailKind},
    geometry::{LayoutMode, Rect},
    host::HostContext,
};

const NO_CHARACTER_TITLE: &str = "No character selected";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundStyle {
    pub opacity: f64,
    pub image: Option<String>,
    /// Frosted backdrop, only used when no image is set.
    pub blur: bool,
}

impl BackgroundStyle {
    fn from_settings(settings: &Settings) -> Self {
        let image = Some(settings.bg_image.clone()).filter(|url| !url.is_empty());
        Self {
            opacity: settings.bg_opacity,
            blur: image.is_none(),
            image,
        }
    }
}

/// Current values for the settings panel inputs.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsForm {
    pub enabled: bool,
    pub show_wand_button: bool,
    pub bg_opacity: f64,
    pub bg_image: String,
    pub char_bubble_color: String,
    pub user_bubble_color: String,
    pub global_char_bubbles: Vec<String>,
    pub global_user_bubbles: Vec<String>,
    pub overrides_title: String,
    pub char_bubbles: Vec<String>,
    pub user_char_bubbles: Vec<String>,
    pub char_image_override: String,
    pub user_image_override: String,
}

/// Edits coming back from the settings panel. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub show_wand_button: Option<bool>,
    pub bg_opacity: Option<f64>,
    pub bg_image: Option<String>,
    pub char_bubble_color: Option<String>,
    pub user_bubble_color: Option<String>,
    pub global_char_bubbles: Option<Vec<String>>,
    pub global_user_bubbles: Option<Vec<String>>,
    pub char_bubbles: Option<Vec<String>>,
    pub user_char_bubbles: Option<Vec<String>>,
    pub char_image_override: Option<String>,
    pub user_image_override: Option<String>,
}

impl SettingsPatch {
    /// Writes global fields into `settings` and per-character fields into the
    /// entry stored under `key`.
    pub fn apply(self, settings: &mut Settings, key: &str) {
        if let Some(enabled) = self.enabled {
            settings.enabled = enabled;
        }
        if let Some(show) = self.show_wand_button {
            settings.show_wand_button = show;
        }
        if let Some(opacity) = self.bg_opacity {
            settings.bg_opacity = opacity;
        }
        if let Some(image) = self.bg_image {
            settings.bg_image = image;
        }
        if let Some(color) = self.char_bubble_color {
            settings.char_bubble_color = color;
        }
        if let Some(color) = self.user_bubble_color {
            settings.user_bubble_color = color;
        }
        if let Some(captions) = self.global_char_bubbles {
            settings.char_bubbles = captions;
        }
        if let Some(captions) = self.global_user_bubbles {
            settings.user_bubbles = captions;
        }

        let (_, entry) = settings.char_data.resolve(Some(key));
        if let Some(captions) = self.char_bubbles {
            entry.char_bubbles = captions;
        }
        if let Some(captions) = self.user_char_bubbles {
            entry.user_char_bubbles = captions;
        }
        if let Some(url) = self.char_image_override {
            entry.char_image_override = url.trim().to_string();
        }
        if let Some(url) = self.user_image_override {
            entry.user_image_override = url.trim().to_string();
        }
        entry.backfill();

        settings.normalize();
    }
}

/// Everything the frontend needs to draw the panel and the settings form.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WidgetView {
    pub visible: bool,
    pub layout: LayoutMode,
    pub geometry: Rect,
    pub draggable: bool,
    pub ignore_click: bool,
    pub show_wand_button: bool,
    pub background: BackgroundStyle,
    pub char_bubble_color: String,
    pub user_bubble_color: String,
    pub character_key: String,
    pub memo: String,
    pub char_avatar: AvatarSource,
    pub user_avatar: AvatarSource,
    pub form: SettingsForm,
    pub saved_notes: Vec<SavedNote>,
}

impl WidgetView {
    pub fn build(
        settings: &Settings,
        key: &str,
        entry: &CharacterEntry,
        host: &HostContext,
        layout: (LayoutMode, Rect),
    ) -> Self {
        let (layout, geometry) = layout;

        let char_avatar = resolve_avatar(
            &entry.char_image_override,
            host.current_avatar_file(),
            ThumbnailKind::Avatar,
            &host.thumbnails,
        );
        let user_avatar = resolve_avatar(
            &entry.user_image_override,
            host.persona_avatar.as_deref(),
            ThumbnailKind::Persona,
            &host.thumbnails,
        );

        let overrides_title = match host.current_name() {
            Some(name) => format!("{name} overrides"),
            None if host.current_character.is_some() => {
                format!("{} overrides", host.directory.display_name(key))
            }
            None => NO_CHARACTER_TITLE.to_string(),
        };

        Self {
            visible: settings.enabled,
            layout,
            geometry,
            draggable: layout == LayoutMode::Floating && !settings.ignore_click,
            ignore_click: settings.ignore_click,
            show_wand_button: settings.show_wand_button,
            background: BackgroundStyle::from_settings(settings),
            char_bubble_color: settings.char_bubble_color.clone(),
            user_bubble_color: settings.user_bubble_color.clone(),
            character_key: key.to_string(),
            memo: entry.memo_content.clone(),
            char_avatar,
            user_avatar,
            form: SettingsForm {
                enabled: settings.enabled,
                show_wand_button: settings.show_wand_button,
                bg_opacity: settings.bg_opacity,
                bg_image: settings.bg_image.clone(),
                char_bubble_color: settings.char_bubble_color.clone(),
                user_bubble_color: settings.user_bubble_color.clone(),
                global_char_bubbles: settings.char_bubbles.clone(),
                global_user_bubbles: settings.user_bubbles.clone(),
                overrides_title,
                char_bubbles: entry.char_bubbles.clone(),
                user_char_bubbles: entry.user_char_bubbles.clone(),
                char_image_override: entry.char_image_override.clone(),
                user_image_override: entry.user_image_override.clone(),
            },
            saved_notes: settings.char_data.saved_notes(&host.directory),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characters::NO_CHARACTER_KEY;

    #[test]
    fn patch_touches_only_given_fields() {
        let mut settings = Settings::default();
        let patch = SettingsPatch {
            bg_opacity: Some(0.3),
            char_bubble_color: Some("".into()),
            char_bubbles: Some(vec!["Mine".into()]),
            char_image_override: Some("  https://img/a.png  ".into()),
            ..SettingsPatch::default()
        };
        patch.apply(&mut settings, "alice.png");

        assert!(settings.enabled);
        assert_eq!(settings.bg_opacity, 0.3);
        // Blank colors reset to their default.
        assert_eq!(settings.char_bubble_color, "#FFFFFF");

        let entry = settings.char_data.get("alice.png").expect("entry");
        assert_eq!(entry.char_bubbles, vec!["Mine", "", ""]);
        assert_eq!(entry.char_image_override, "https://img/a.png");
        assert!(settings.char_data.get(NO_CHARACTER_KEY).is_none());
    }

    #[test]
    fn patch_repairs_bad_opacity() {
        let mut settings = Settings::default();
        SettingsPatch {
            bg_opacity: Some(f64::NAN),
            ..SettingsPatch::default()
        }
        .apply(&mut settings, NO_CHARACTER_KEY);
        assert_eq!(settings.bg_opacity, 0.7);
    }

    #[test]
    fn background_blurs_only_without_image() {
        let mut settings = Settings::default();
        assert!(BackgroundStyle::from_settings(&settings).blur);
        settings.bg_image = "https://img/bg.jpg".into();
        let style = BackgroundStyle::from_settings(&settings);
        assert!(!style.blur);
        assert_eq!(style.image.as_deref(), Some("https://img/bg.jpg"));
    }
}
