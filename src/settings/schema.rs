//! Persisted settings shape and its load-time normalization.
//!
//! Everything read from disk goes through [`Settings::from_value`] exactly once.
//! After that the rest of the crate works with fully-typed values and never checks
//! for missing fields again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::characters::CharacterBook;

pub const SCHEMA_VERSION: u32 = 1;

/// Number of caption inputs the settings panel shows per list.
pub const CAPTION_SLOTS: usize = 3;

pub const DEFAULT_WIDTH: f64 = 350.0;
pub const DEFAULT_HEIGHT: f64 = 250.0;
pub const DEFAULT_BG_OPACITY: f64 = 0.7;
pub const DEFAULT_CHAR_BUBBLE_COLOR: &str = "#FFFFFF";
pub const DEFAULT_USER_BUBBLE_COLOR: &str = "#F0F0F0";

/// Key the host used for the widget inside its shared extension-settings object.
const LEGACY_NAMESPACE: &str = "Popupmemo";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub top: f64,
    pub left: f64,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            top: 50.0,
            left: 50.0,
        }
    }
}

impl Position {
    pub fn is_finite(&self) -> bool {
        self.top.is_finite() && self.left.is_finite()
    }
}

/// Per-character partition of the settings tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CharacterEntry {
    pub memo_content: String,
    pub char_bubbles: Vec<String>,
    pub user_char_bubbles: Vec<String>,
    pub char_image_override: String,
    pub user_image_override: String,
    /// Last edit of `memo_content`; orders the saved-notes listing.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for CharacterEntry {
    fn default() -> Self {
        Self {
            memo_content: String::new(),
            char_bubbles: empty_captions(),
            user_char_bubbles: empty_captions(),
            char_image_override: String::new(),
            user_image_override: String::new(),
            updated_at: None,
        }
    }
}

impl CharacterEntry {
    /// Pads both caption lists back up to the panel's slot count.
    /// Returns true when anything had to be filled in.
    pub fn backfill(&mut self) -> bool {
        let char_filled = pad_captions(&mut self.char_bubbles);
        let user_filled = pad_captions(&mut self.user_char_bubbles);
        char_filled || user_filled
    }

    pub fn has_memo(&self) -> bool {
        !self.memo_content.trim().is_empty()
    }

    fn from_value(value: &Value) -> Self {
        let mut entry = Self {
            memo_content: string_field(value, "memoContent").unwrap_or_default(),
            char_bubbles: caption_field(value, "charBubbles").unwrap_or_else(empty_captions),
            user_char_bubbles: caption_field(value, "userCharBubbles")
                .unwrap_or_else(empty_captions),
            char_image_override: string_field(value, "charImageOverride").unwrap_or_default(),
            user_image_override: string_field(value, "userImageOverride").unwrap_or_default(),
            updated_at: string_field(value, "updatedAt").and_then(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            }),
        };
        entry.backfill();
        entry
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub schema_version: u32,
    pub enabled: bool,
    pub ignore_click: bool,
    pub show_wand_button: bool,
    pub pos: Position,
    pub width: f64,
    pub height: f64,
    pub bg_opacity: f64,
    pub bg_image: String,
    pub char_bubble_color: String,
    pub user_bubble_color: String,
    pub char_bubbles: Vec<String>,
    pub user_bubbles: Vec<String>,
    pub char_data: CharacterBook,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            enabled: true,
            ignore_click: false,
            show_wand_button: true,
            pos: Position::default(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            bg_opacity: DEFAULT_BG_OPACITY,
            bg_image: String::new(),
            char_bubble_color: DEFAULT_CHAR_BUBBLE_COLOR.into(),
            user_bubble_color: DEFAULT_USER_BUBBLE_COLOR.into(),
            char_bubbles: empty_captions(),
            user_bubbles: empty_captions(),
            char_data: CharacterBook::default(),
        }
    }
}

impl Settings {
    /// Builds a fully-populated `Settings` from whatever JSON was persisted.
    ///
    /// Unknown keys are dropped, wrong-typed or missing keys fall back to their
    /// defaults, and unversioned files are migrated to the current schema.
    pub fn from_value(value: &Value) -> Self {
        let root = unwrap_legacy_namespace(value);
        let defaults = Settings::default();

        let Some(obj) = root.as_object() else {
            return defaults;
        };

        let version = obj
            .get("schemaVersion")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let mut char_bubbles = caption_field(root, "charBubbles");
        let mut char_bubble_color = string_field(root, "charBubbleColor");
        if version == 0 {
            // Older builds kept a single caption list and color for the character.
            if char_bubbles.is_none() {
                char_bubbles = caption_field(root, "bubbles");
            }
            if char_bubble_color.is_none() {
                char_bubble_color = string_field(root, "bubbleColor");
            }
        }

        let pos = obj
            .get("pos")
            .and_then(|pos| {
                Some(Position {
                    top: pos.get("top")?.as_f64()?,
                    left: pos.get("left")?.as_f64()?,
                })
            })
            .unwrap_or(defaults.pos);

        let mut settings = Settings {
            schema_version: SCHEMA_VERSION,
            enabled: bool_field(root, "enabled").unwrap_or(defaults.enabled),
            ignore_click: bool_field(root, "ignoreClick").unwrap_or(defaults.ignore_click),
            show_wand_button: bool_field(root, "showWandButton")
                .unwrap_or(defaults.show_wand_button),
            pos,
            width: number_field(root, "width").unwrap_or(defaults.width),
            height: number_field(root, "height").unwrap_or(defaults.height),
            bg_opacity: number_field(root, "bgOpacity").unwrap_or(defaults.bg_opacity),
            bg_image: string_field(root, "bgImage").unwrap_or_default(),
            char_bubble_color: char_bubble_color.unwrap_or_default(),
            user_bubble_color: string_field(root, "userBubbleColor").unwrap_or_default(),
            char_bubbles: char_bubbles.unwrap_or_else(empty_captions),
            user_bubbles: caption_field(root, "userBubbles").unwrap_or_else(empty_captions),
            char_data: character_book(obj.get("charData")),
        };
        settings.normalize();
        settings
    }

    /// Repairs values that would break rendering. Runs after load and after
    /// every settings-panel patch.
    pub fn normalize(&mut self) {
        self.schema_version = SCHEMA_VERSION;

        if !self.pos.is_finite() {
            self.pos = Position::default();
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            self.width = DEFAULT_WIDTH;
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            self.height = DEFAULT_HEIGHT;
        }

        self.bg_opacity = if self.bg_opacity.is_finite() {
            self.bg_opacity.clamp(0.0, 1.0)
        } else {
            DEFAULT_BG_OPACITY
        };
        self.bg_image = self.bg_image.trim().to_string();

        self.char_bubble_color = color_or(&self.char_bubble_color, DEFAULT_CHAR_BUBBLE_COLOR);
        self.user_bubble_color = color_or(&self.user_bubble_color, DEFAULT_USER_BUBBLE_COLOR);

        pad_captions(&mut self.char_bubbles);
        pad_captions(&mut self.user_bubbles);
    }
}

pub fn empty_captions() -> Vec<String> {
    vec![String::new(); CAPTION_SLOTS]
}

fn pad_captions(captions: &mut Vec<String>) -> bool {
    if captions.len() >= CAPTION_SLOTS {
        return false;
    }
    captions.resize(CAPTION_SLOTS, String::new());
    true
}

fn color_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn unwrap_legacy_namespace(value: &Value) -> &Value {
    match value.get(LEGACY_NAMESPACE) {
        Some(nested) if nested.is_object() && value.get("schemaVersion").is_none() => nested,
        _ => value,
    }
}

fn character_book(value: Option<&Value>) -> CharacterBook {
    let mut book = CharacterBook::default();
    let Some(entries) = value.and_then(Value::as_object) else {
        return book;
    };
    for (key, raw) in entries {
        // Null or scalar entries carry nothing worth keeping; the key is recreated
        // lazily on the next visit.
        if raw.is_object() {
            book.insert(key.clone(), CharacterEntry::from_value(raw));
        }
    }
    book
}

fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key)
}

fn bool_field(value: &Value, key: &str) -> Option<bool> {
    field(value, key).and_then(Value::as_bool)
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    field(value, key).and_then(Value::as_f64)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    field(value, key).and_then(Value::as_str).map(str::to_string)
}

fn caption_field(value: &Value, key: &str) -> Option<Vec<String>> {
    let items = field(value, key)?.as_array()?;
    Some(
        items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect(),
    )
}
