use serde::Serialize;
use tauri::{AppHandle, Emitter};

use crate::bubbles::{BubbleFrame, BubbleSink, Track};

use super::view::WidgetView;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ToastLevel {
    Info,
    Warning,
}

/// Transient, non-blocking notification for the user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Warning,
            message: message.into(),
        }
    }
}

/// Everything the controller pushes to the frontend.
pub trait UiSink: BubbleSink {
    fn view(&self, view: &WidgetView);
    fn toast(&self, toast: Toast);
}

#[derive(Serialize, Clone)]
struct BubbleEvent {
    track: Track,
    frame: BubbleFrame,
}

/// Forwards controller output to the webview as Tauri events.
pub struct TauriUi {
    app_handle: AppHandle,
}

impl TauriUi {
    pub fn new(app_handle: AppHandle) -> Self {
        Self { app_handle }
    }
}

impl BubbleSink for TauriUi {
    fn bubble(&self, track: Track, frame: BubbleFrame) {
        let _ = self
            .app_handle
            .emit("memo-bubble", BubbleEvent { track, frame });
    }
}

impl UiSink for TauriUi {
    fn view(&self, view: &WidgetView) {
        if let Err(err) = self.app_handle.emit("memo-view", view) {
            log::error!("Failed to emit memo-view: {err}");
        }
    }

    fn toast(&self, toast: Toast) {
        let _ = self.app_handle.emit("memo-toast", toast);
    }
}
