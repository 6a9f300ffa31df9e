use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    bubbles::{effective_captions, RotationTrack, Track, TrackPhase},
    settings::{schema::empty_captions, Position, Settings, SettingsStore},
};

use super::{
    avatar::ThumbnailUrls,
    geometry::{
        layout_mode, panel_geometry, DragState, LayoutMode, Pointer, PointerTarget, Rect,
        Viewport,
    },
    host::{HostContext, HostSync},
    ui::{Toast, UiSink},
    view::{SettingsPatch, WidgetView},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// How a render treats the two caption tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rotation {
    /// Start both tracks over from the first caption.
    Restart,
    /// Restart both tracks where they left off.
    Resume,
    /// Leave running tracks untouched; only the view is refreshed.
    Keep,
}

struct ControllerState {
    host: HostContext,
    viewport: Option<Viewport>,
    chat_container: Option<Rect>,
    drag: DragState,
    char_track: RotationTrack,
    user_track: RotationTrack,
    /// Character key the panel was last rendered for.
    bound_key: Option<String>,
    fallback_notified: bool,
}

struct Rendered {
    view: WidgetView,
    char_captions: Vec<String>,
    user_captions: Vec<String>,
    enabled: bool,
}

fn floating_rect(settings: &Settings) -> Rect {
    Rect {
        top: settings.pos.top,
        left: settings.pos.left,
        width: settings.width,
        height: settings.height,
    }
}

fn ensure_confirmed(confirmed: bool, action: &str) -> Result<()> {
    if !confirmed {
        bail!("{action} needs confirmation");
    }
    Ok(())
}

/// Ties the settings store, the character partitions and both caption tracks
/// to the host's lifecycle events and the user's edits.
#[derive(Clone)]
pub struct WidgetController {
    store: SettingsStore,
    ui: Arc<dyn UiSink>,
    state: Arc<Mutex<ControllerState>>,
}

impl WidgetController {
    pub fn new<S: UiSink>(store: SettingsStore, sink: Arc<S>) -> Self {
        let state = ControllerState {
            host: HostContext::default(),
            viewport: None,
            chat_container: None,
            drag: DragState::default(),
            char_track: RotationTrack::new(Track::Character, sink.clone()),
            user_track: RotationTrack::new(Track::User, sink.clone()),
            bound_key: None,
            fallback_notified: false,
        };

        Self {
            store,
            ui: sink,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub async fn initialize(&self) {
        let mut state = self.state.lock().await;
        self.render(&mut state, Rotation::Restart);
        log_info!("Memo widget ready for '{}'", state.host.current_key());
    }

    pub async fn current_view(&self) -> WidgetView {
        let state = self.state.lock().await;
        self.build(&state).view
    }

    // Host lifecycle

    pub async fn on_character_selected(&self, sync: HostSync) {
        let mut state = self.state.lock().await;
        state.host.apply(sync);
        self.render(&mut state, Rotation::Restart);
    }

    pub async fn on_chat_changed(&self, sync: HostSync) {
        let mut state = self.state.lock().await;
        state.host.apply(sync);
        self.render(&mut state, Rotation::Restart);
    }

    /// Refreshes host data without treating it as a navigation event. The
    /// tracks only restart if the current character turned out to differ.
    pub async fn sync_host(&self, sync: HostSync) {
        let mut state = self.state.lock().await;
        state.host.apply(sync);
        self.render(&mut state, Rotation::Keep);
    }

    pub async fn on_persona_updated(&self, persona_avatar: Option<String>) {
        let mut state = self.state.lock().await;
        state.host.persona_avatar = persona_avatar.filter(|p| !p.trim().is_empty());
        self.render(&mut state, Rotation::Keep);
    }

    pub async fn on_settings_updated(&self) {
        let mut state = self.state.lock().await;
        self.render(&mut state, Rotation::Keep);
    }

    pub async fn set_thumbnail_template(&self, template: Option<String>) {
        let mut state = self.state.lock().await;
        state.host.thumbnails = ThumbnailUrls::new(template);
        self.render(&mut state, Rotation::Keep);
    }

    // User edits

    /// Stores memo text for `key` (the character the text area was rendered
    /// for), or for the current character when the caller does not know it.
    pub async fn update_memo(&self, key: Option<String>, text: String) {
        let state = self.state.lock().await;
        let key = key.unwrap_or_else(|| state.host.current_key());
        self.store.update(|settings| {
            let (_, entry) = settings.char_data.resolve(Some(key.as_str()));
            if entry.memo_content != text {
                entry.memo_content = text;
                entry.updated_at = Some(Utc::now());
            }
        });
        self.ui.view(&self.build(&state).view);
    }

    pub async fn toggle_ignore_click(&self) -> bool {
        let mut state = self.state.lock().await;
        let ignore = self.store.update(|settings| {
            settings.ignore_click = !settings.ignore_click;
            settings.ignore_click
        });
        if ignore {
            state.drag.end();
        }
        self.render(&mut state, Rotation::Keep);
        ignore
    }

    pub async fn apply_settings(&self, patch: SettingsPatch) {
        let mut state = self.state.lock().await;
        let key = state.host.current_key();
        self.store.update(|settings| patch.apply(settings, &key));
        self.render(&mut state, Rotation::Resume);
    }

    /// Empties both global caption lists. Per-character overrides are kept.
    pub async fn reset_global_captions(&self, confirmed: bool) -> Result<()> {
        ensure_confirmed(confirmed, "Resetting all captions")?;
        let mut state = self.state.lock().await;
        self.store.update(|settings| {
            settings.char_bubbles = empty_captions();
            settings.user_bubbles = empty_captions();
        });
        log_info!("Global captions reset");
        self.render(&mut state, Rotation::Restart);
        Ok(())
    }

    /// Deletes a character's memo and overrides. Returns whether anything was
    /// stored under `key`.
    pub async fn delete_note(&self, key: &str, confirmed: bool) -> Result<bool> {
        ensure_confirmed(confirmed, "Deleting a memo")?;
        let mut state = self.state.lock().await;
        let removed = self.store.update(|settings| settings.char_data.delete(key));
        if removed.is_some() {
            log_info!("Deleted memo data for '{key}'");
        }

        let rotation = if key == state.host.current_key() {
            Rotation::Restart
        } else {
            Rotation::Keep
        };
        self.render(&mut state, rotation);
        Ok(removed.is_some())
    }

    /// Moves one character's memo and overrides onto another character.
    pub async fn migrate_note(&self, from: &str, to: &str, confirmed: bool) -> Result<()> {
        ensure_confirmed(confirmed, "Moving a memo")?;
        let mut state = self.state.lock().await;

        if let Err(err) = self
            .store
            .with_settings_mut(|settings| settings.char_data.migrate(from, to))
        {
            log_warn!("Memo move from '{from}' to '{to}' rejected: {err}");
            self.ui.toast(Toast::warning(err.to_string()));
            return Err(err);
        }
        self.store.save();
        log_info!("Moved memo data from '{from}' to '{}'", to.trim());

        let current = state.host.current_key();
        let rotation = if current == from || current == to.trim() {
            Rotation::Restart
        } else {
            Rotation::Keep
        };
        self.render(&mut state, rotation);
        Ok(())
    }

    pub async fn memo_text(&self, key: &str) -> Option<String> {
        self.store
            .read(|settings| settings.char_data.get(key).map(|e| e.memo_content.clone()))
    }

    // Geometry

    pub async fn begin_drag(&self, pointer: Pointer, target: PointerTarget) -> bool {
        let mut state = self.state.lock().await;
        let (ignore_click, panel) = self
            .store
            .read(|settings| (settings.ignore_click, floating_rect(settings)));
        if ignore_click || layout_mode(state.viewport) == LayoutMode::Docked {
            return false;
        }
        state.drag.begin(pointer, target, panel)
    }

    /// Moves the panel under the pointer, clamped to the viewport.
    pub async fn drag_to(&self, pointer: Pointer) -> Option<Position> {
        let state = self.state.lock().await;
        let size = self.store.read(|settings| (settings.width, settings.height));
        let viewport = state.viewport.unwrap_or(Viewport {
            width: f64::INFINITY,
            height: f64::INFINITY,
        });
        let position = state.drag.drag_to(pointer, size, viewport)?;
        self.store.update(|settings| settings.pos = position);
        Some(position)
    }

    pub async fn end_drag(&self) {
        let mut state = self.state.lock().await;
        if state.drag.end() {
            self.render(&mut state, Rotation::Keep);
        }
    }

    /// Persists a finished resize. Returns false when nothing changed.
    pub async fn resize(&self, width: f64, height: f64) -> bool {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return false;
        }
        let mut state = self.state.lock().await;
        if layout_mode(state.viewport) == LayoutMode::Docked {
            return false;
        }
        let unchanged = self
            .store
            .read(|settings| settings.width == width && settings.height == height);
        if unchanged {
            return false;
        }
        self.store.update(|settings| {
            settings.width = width;
            settings.height = height;
        });
        self.render(&mut state, Rotation::Keep);
        true
    }

    /// Recomputes the layout on every report; narrow viewports dock the panel
    /// onto the chat container.
    pub async fn report_viewport(&self, viewport: Viewport, chat_container: Option<Rect>) {
        let mut state = self.state.lock().await;
        state.viewport = Some(viewport);
        state.chat_container = chat_container;
        if layout_mode(state.viewport) == LayoutMode::Docked {
            state.drag.end();
        }
        self.render(&mut state, Rotation::Keep);
    }

    fn build(&self, state: &ControllerState) -> Rendered {
        let key = state.host.current_key();
        let mode = layout_mode(state.viewport);

        self.store.with_settings_mut(|settings| {
            let entry = settings.char_data.resolve(Some(key.as_str())).1.clone();
            let layout = panel_geometry(mode, floating_rect(settings), state.chat_container);
            let char_captions =
                effective_captions(&entry.char_bubbles, &settings.char_bubbles).to_vec();
            let user_captions =
                effective_captions(&entry.user_char_bubbles, &settings.user_bubbles).to_vec();

            Rendered {
                view: WidgetView::build(settings, &key, &entry, &state.host, layout),
                char_captions,
                user_captions,
                enabled: settings.enabled,
            }
        })
    }

    fn render(&self, state: &mut ControllerState, rotation: Rotation) {
        let rendered = self.build(state);
        let key = rendered.view.character_key.clone();
        let switched = state.bound_key.as_deref() != Some(key.as_str());

        let rotation = if switched { Rotation::Restart } else { rotation };
        let tracks_running = state.char_track.phase() != TrackPhase::Idle
            || state.user_track.phase() != TrackPhase::Idle;

        if !rendered.enabled {
            if tracks_running || rotation != Rotation::Keep {
                state.char_track.stop();
                state.user_track.stop();
            }
        } else if rotation != Rotation::Keep || !tracks_running {
            let (char_from, user_from) = match rotation {
                Rotation::Restart => (0, 0),
                _ => (
                    state.char_track.resume_index(),
                    state.user_track.resume_index(),
                ),
            };
            state.char_track.start(&rendered.char_captions, char_from);
            state.user_track.start(&rendered.user_captions, user_from);
        }

        if switched {
            log_debug!("Memo panel bound to '{key}'");
            state.drag.end();
        }
        state.bound_key = Some(key);

        let fallback = rendered.view.char_avatar.used_fallback()
            || rendered.view.user_avatar.used_fallback();
        if fallback && !state.fallback_notified {
            state.fallback_notified = true;
            self.ui.toast(Toast::info(
                "Host thumbnail service unavailable; loading avatars directly",
            ));
        }

        self.ui.view(&rendered.view);
    }

    #[cfg(test)]
    async fn live_timers(&self) -> (bool, bool) {
        let state = self.state.lock().await;
        (
            state.char_track.has_live_timer(),
            state.user_track.has_live_timer(),
        )
    }
}
