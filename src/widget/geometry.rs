//! Panel placement: viewport clamping, drag tracking and the narrow-viewport
//! docked layout.

use serde::{Deserialize, Serialize};

use crate::settings::Position;

/// Viewports narrower than this dock the panel onto the host's chat area.
pub const NARROW_BREAKPOINT: f64 = 768.0;

/// Size of the native bottom-right resize grip.
pub const RESIZE_HANDLE: f64 = 10.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn is_usable(&self) -> bool {
        [self.top, self.left, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum LayoutMode {
    #[default]
    Floating,
    Docked,
}

pub fn layout_mode(viewport: Option<Viewport>) -> LayoutMode {
    match viewport {
        Some(viewport) if viewport.width < NARROW_BREAKPOINT => LayoutMode::Docked,
        _ => LayoutMode::Floating,
    }
}

/// Panel geometry for the current layout. Docked panels cover the chat
/// container; without a usable container they keep the floating geometry.
pub fn panel_geometry(
    mode: LayoutMode,
    floating: Rect,
    chat_container: Option<Rect>,
) -> (LayoutMode, Rect) {
    match (mode, chat_container) {
        (LayoutMode::Docked, Some(container)) if container.is_usable() => {
            (LayoutMode::Docked, container)
        }
        _ => (LayoutMode::Floating, floating),
    }
}

/// Keeps the panel's top-left corner inside the viewport.
pub fn clamp_to_viewport(left: f64, top: f64, size: (f64, f64), viewport: Viewport) -> Position {
    let (width, height) = size;
    let left = left.min(viewport.width - width).max(0.0);
    let top = top.min(viewport.height - height).max(0.0);
    Position { top, left }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

/// Which part of the panel a press landed on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PointerTarget {
    Panel,
    Avatar,
    Controls,
    TextArea,
}

pub fn is_resize_handle(pointer: Pointer, panel: Rect) -> bool {
    pointer.x > panel.right() - RESIZE_HANDLE && pointer.y > panel.bottom() - RESIZE_HANDLE
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { offset_x: f64, offset_y: f64 },
}

impl DragState {
    /// Starts a drag unless the press belongs to an interactive child or the
    /// resize grip.
    pub fn begin(&mut self, pointer: Pointer, target: PointerTarget, panel: Rect) -> bool {
        if target != PointerTarget::Panel || is_resize_handle(pointer, panel) {
            return false;
        }
        *self = DragState::Dragging {
            offset_x: pointer.x - panel.left,
            offset_y: pointer.y - panel.top,
        };
        true
    }

    /// New clamped position for the pointer, or `None` when not dragging.
    pub fn drag_to(
        &self,
        pointer: Pointer,
        size: (f64, f64),
        viewport: Viewport,
    ) -> Option<Position> {
        match *self {
            DragState::Idle => None,
            DragState::Dragging { offset_x, offset_y } => Some(clamp_to_viewport(
                pointer.x - offset_x,
                pointer.y - offset_y,
                size,
                viewport,
            )),
        }
    }

    pub fn end(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        *self = DragState::Idle;
        was_dragging
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging { .. })
    }
}
