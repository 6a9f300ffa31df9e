use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ROTATION_PERIOD: Duration = Duration::from_millis(7000);
pub const FADE_OUT: Duration = Duration::from_millis(300);
pub const FADE_IN_SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Track {
    Character,
    User,
}

impl Track {
    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Character => "character",
            Track::User => "user",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TrackPhase {
    #[default]
    Idle,
    Static,
    Rotating,
}

/// A single display instruction for one caption bubble.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BubbleFrame {
    /// Empty the bubble and hide it.
    Clear,
    /// Put `text` in the bubble at full opacity.
    Show { text: String, index: usize },
    FadeOut,
    FadeIn,
    /// Transition finished; drop any animation state.
    Settle,
}

/// What `start` should do for a given caption list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationPlan {
    Idle,
    Static(String),
    Rotating { captions: Vec<String>, first: usize },
}

impl RotationPlan {
    pub fn phase(&self) -> TrackPhase {
        match self {
            RotationPlan::Idle => TrackPhase::Idle,
            RotationPlan::Static(_) => TrackPhase::Static,
            RotationPlan::Rotating { .. } => TrackPhase::Rotating,
        }
    }
}

pub fn is_valid_caption(caption: &str) -> bool {
    !caption.trim().is_empty()
}

/// Captions that would actually show something, in their original order and
/// with their original spacing.
pub fn valid_captions(raw: &[String]) -> Vec<String> {
    raw.iter()
        .filter(|caption| is_valid_caption(caption))
        .cloned()
        .collect()
}

/// Pure transition: the phase a track enters for `raw`, resuming at
/// `current_index` (taken modulo the number of valid captions).
pub fn plan(raw: &[String], current_index: usize) -> RotationPlan {
    let mut captions = valid_captions(raw);
    match captions.len() {
        0 => RotationPlan::Idle,
        1 => RotationPlan::Static(captions.remove(0)),
        len => RotationPlan::Rotating {
            first: current_index % len,
            captions,
        },
    }
}

/// The per-character list wins as soon as one of its slots has text.
pub fn effective_captions<'a>(own: &'a [String], global: &'a [String]) -> &'a [String] {
    if own.iter().any(|caption| is_valid_caption(caption)) {
        own
    } else {
        global
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_valid_captions_plans_idle() {
        assert_eq!(plan(&[], 0), RotationPlan::Idle);
        assert_eq!(plan(&strings(&["", "  ", "\t\n"]), 5), RotationPlan::Idle);
    }

    #[test]
    fn single_valid_caption_plans_static() {
        let planned = plan(&strings(&["", "Only this", "   "]), 2);
        assert_eq!(planned, RotationPlan::Static("Only this".into()));
        assert_eq!(planned.phase(), TrackPhase::Static);
    }

    #[test]
    fn several_captions_plan_rotation_from_wrapped_index() {
        let planned = plan(&strings(&["Hi", "", "Bye", "Later"]), 4);
        assert_eq!(
            planned,
            RotationPlan::Rotating {
                captions: strings(&["Hi", "Bye", "Later"]),
                first: 1,
            }
        );
    }

    #[test]
    fn captions_keep_their_spacing() {
        assert_eq!(
            valid_captions(&strings(&[" padded ", ""])),
            strings(&[" padded "])
        );
    }

    #[test]
    fn blank_override_falls_back_to_global() {
        let global = strings(&["Hi", "", "Bye"]);
        let own = strings(&["", "", ""]);
        assert_eq!(effective_captions(&own, &global), global.as_slice());
    }

    #[test]
    fn single_override_slot_wins() {
        let global = strings(&["Hi", "", "Bye"]);
        let own = strings(&["", "Only this", ""]);
        let effective = effective_captions(&own, &global);
        assert_eq!(effective, own.as_slice());
        assert_eq!(plan(effective, 0), RotationPlan::Static("Only this".into()));
    }
}
