//! Recording sink shared by the track and controller tests.

use std::sync::Mutex;

use crate::{
    bubbles::{BubbleFrame, BubbleSink, Track},
    widget::{
        ui::{Toast, UiSink},
        view::WidgetView,
    },
};

#[derive(Default)]
pub(crate) struct RecordingSink {
    frames: Mutex<Vec<(Track, BubbleFrame)>>,
    views: Mutex<Vec<WidgetView>>,
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingSink {
    pub(crate) fn frames(&self, track: Track) -> Vec<BubbleFrame> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == track)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    /// Returns and forgets the frames recorded so far for `track`.
    pub(crate) fn take(&self, track: Track) -> Vec<BubbleFrame> {
        let mut frames = self.frames.lock().unwrap();
        let (taken, kept): (Vec<_>, Vec<_>) = frames.drain(..).partition(|(t, _)| *t == track);
        *frames = kept;
        taken.into_iter().map(|(_, frame)| frame).collect()
    }

    pub(crate) fn last_view(&self) -> Option<WidgetView> {
        self.views.lock().unwrap().last().cloned()
    }

    pub(crate) fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }
}

impl BubbleSink for RecordingSink {
    fn bubble(&self, track: Track, frame: BubbleFrame) {
        self.frames.lock().unwrap().push((track, frame));
    }
}

impl UiSink for RecordingSink {
    fn view(&self, view: &WidgetView) {
        self.views.lock().unwrap().push(view.clone());
    }

    fn toast(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }
}
