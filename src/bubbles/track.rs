use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use serde::Serialize;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::state::{
    plan, BubbleFrame, RotationPlan, Track, TrackPhase, FADE_IN_SETTLE, FADE_OUT,
    ROTATION_PERIOD,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Receives the display instructions a track produces.
pub trait BubbleSink: Send + Sync + 'static {
    fn bubble(&self, track: Track, frame: BubbleFrame);
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub phase: TrackPhase,
    /// Index of the caption the next advance will show.
    pub resume_index: usize,
}

#[derive(Debug, Clone, Copy)]
struct RotationTiming {
    period: Duration,
    fade_out: Duration,
    fade_in_settle: Duration,
}

impl Default for RotationTiming {
    fn default() -> Self {
        Self {
            period: ROTATION_PERIOD,
            fade_out: FADE_OUT,
            fade_in_settle: FADE_IN_SETTLE,
        }
    }
}

/// Rotation position shared by a track and its timer task. Every start or stop
/// bumps `generation`; a task holding an older generation emits nothing and
/// never touches `next`.
#[derive(Debug, Default)]
struct Cursor {
    generation: u64,
    next: usize,
}

fn lock_cursor(cursor: &Mutex<Cursor>) -> MutexGuard<'_, Cursor> {
    match cursor.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Runs `emit` while holding the cursor, but only for the current generation.
fn emit_if_current(cursor: &Mutex<Cursor>, generation: u64, emit: impl FnOnce()) -> bool {
    let state = lock_cursor(cursor);
    if state.generation != generation {
        return false;
    }
    emit();
    true
}

struct RotationTimer {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl RotationTimer {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }

    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

/// One caption track (character or user). Owns at most one rotation timer.
pub struct RotationTrack {
    track: Track,
    sink: Arc<dyn BubbleSink>,
    phase: TrackPhase,
    timing: RotationTiming,
    cursor: Arc<Mutex<Cursor>>,
    timer: Option<RotationTimer>,
}

impl RotationTrack {
    pub fn new(track: Track, sink: Arc<dyn BubbleSink>) -> Self {
        Self::with_timing(track, sink, RotationTiming::default())
    }

    fn with_timing(track: Track, sink: Arc<dyn BubbleSink>, timing: RotationTiming) -> Self {
        Self {
            track,
            sink,
            phase: TrackPhase::Idle,
            timing,
            cursor: Arc::new(Mutex::new(Cursor::default())),
            timer: None,
        }
    }

    pub fn phase(&self) -> TrackPhase {
        self.phase
    }

    /// Where a restart should pick up so nothing is skipped or repeated. Follows
    /// the running timer.
    pub fn resume_index(&self) -> usize {
        lock_cursor(&self.cursor).next
    }

    pub fn has_live_timer(&self) -> bool {
        self.timer.as_ref().is_some_and(RotationTimer::is_live)
    }

    /// Cancels any running rotation, then enters the phase `raw` calls for.
    pub fn start(&mut self, raw: &[String], current_index: usize) -> StartOutcome {
        self.cancel_timer();

        let planned = plan(raw, current_index);
        self.phase = planned.phase();

        // The first frame and the new index land under the cursor lock, after
        // any advance a retired task is still finishing.
        let (generation, resume_index, rotating) = {
            let mut cursor = lock_cursor(&self.cursor);
            cursor.generation = cursor.generation.wrapping_add(1);

            let (resume_index, rotating) = match planned {
                RotationPlan::Idle => {
                    self.sink.bubble(self.track, BubbleFrame::Clear);
                    (0, None)
                }
                RotationPlan::Static(text) => {
                    self.sink
                        .bubble(self.track, BubbleFrame::Show { text, index: 0 });
                    (0, None)
                }
                RotationPlan::Rotating { captions, first } => {
                    self.sink.bubble(
                        self.track,
                        BubbleFrame::Show {
                            text: captions[first].clone(),
                            index: first,
                        },
                    );
                    ((first + 1) % captions.len(), Some(captions))
                }
            };
            cursor.next = resume_index;
            (cursor.generation, resume_index, rotating)
        };

        if let Some(captions) = rotating {
            self.spawn_timer(captions, generation);
        }

        log_debug!(
            "{} bubble track -> {:?} (resume at {})",
            self.track.as_str(),
            self.phase,
            resume_index
        );

        StartOutcome {
            phase: self.phase,
            resume_index,
        }
    }

    /// Cancels rotation and clears the bubble. The resume index is kept.
    pub fn stop(&mut self) {
        self.cancel_timer();
        self.phase = TrackPhase::Idle;

        let mut cursor = lock_cursor(&self.cursor);
        cursor.generation = cursor.generation.wrapping_add(1);
        self.sink.bubble(self.track, BubbleFrame::Clear);
    }

    fn cancel_timer(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.stop();
                true
            }
            None => false,
        }
    }

    fn spawn_timer(&mut self, captions: Vec<String>, generation: u64) {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                log_warn!(
                    "No async runtime for {} bubble rotation; showing first caption only",
                    self.track.as_str()
                );
                return;
            }
        };

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(rotation_loop(
            self.track,
            captions,
            self.timing,
            generation,
            self.cursor.clone(),
            self.sink.clone(),
            cancel.clone(),
        ));
        self.timer = Some(RotationTimer { handle, cancel });
    }
}

impl Drop for RotationTrack {
    fn drop(&mut self) {
        self.cancel_timer();
        let mut cursor = lock_cursor(&self.cursor);
        cursor.generation = cursor.generation.wrapping_add(1);
    }
}

/// Waits `duration` unless cancelled first. Returns false on cancellation.
async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = time::sleep(duration) => true,
    }
}

async fn rotation_loop(
    track: Track,
    captions: Vec<String>,
    timing: RotationTiming,
    generation: u64,
    cursor: Arc<Mutex<Cursor>>,
    sink: Arc<dyn BubbleSink>,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + timing.period, timing.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !emit_if_current(&cursor, generation, || sink.bubble(track, BubbleFrame::FadeOut)) {
            break;
        }
        if !pause(&cancel, timing.fade_out).await {
            break;
        }

        let swapped = {
            let mut state = lock_cursor(&cursor);
            if state.generation == generation {
                let index = state.next % captions.len();
                sink.bubble(
                    track,
                    BubbleFrame::Show {
                        text: captions[index].clone(),
                        index,
                    },
                );
                sink.bubble(track, BubbleFrame::FadeIn);
                state.next = (index + 1) % captions.len();
                true
            } else {
                false
            }
        };
        if !swapped {
            break;
        }

        if !pause(&cancel, timing.fade_in_settle).await {
            break;
        }
        if !emit_if_current(&cursor, generation, || sink.bubble(track, BubbleFrame::Settle)) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use std::{sync::mpsc, thread};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn show(text: &str, index: usize) -> BubbleFrame {
        BubbleFrame::Show {
            text: text.into(),
            index,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn no_valid_captions_goes_idle_without_timer() {
        let sink = Arc::new(RecordingSink::default());
        let mut track = RotationTrack::new(Track::Character, sink.clone());

        let outcome = track.start(&strings(&["", "  "]), 3);
        assert_eq!(
            outcome,
            StartOutcome {
                phase: TrackPhase::Idle,
                resume_index: 0
            }
        );
        assert!(!track.has_live_timer());
        assert_eq!(sink.frames(Track::Character), vec![BubbleFrame::Clear]);

        time::sleep(ROTATION_PERIOD * 2).await;
        assert_eq!(sink.frames(Track::Character).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_caption_shows_once_without_timer() {
        let sink = Arc::new(RecordingSink::default());
        let mut track = RotationTrack::new(Track::User, sink.clone());

        let outcome = track.start(&strings(&["", "Only this", ""]), 0);
        assert_eq!(outcome.phase, TrackPhase::Static);
        assert!(!track.has_live_timer());

        time::sleep(ROTATION_PERIOD * 3).await;
        assert_eq!(sink.frames(Track::User), vec![show("Only this", 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn rotation_runs_fade_sequence_each_period() {
        let sink = Arc::new(RecordingSink::default());
        let mut track = RotationTrack::new(Track::Character, sink.clone());

        let outcome = track.start(&strings(&["Hi", "", "Bye"]), 0);
        assert_eq!(
            outcome,
            StartOutcome {
                phase: TrackPhase::Rotating,
                resume_index: 1
            }
        );
        assert!(track.has_live_timer());
        assert_eq!(sink.take(Track::Character), vec![show("Hi", 0)]);

        time::sleep(ROTATION_PERIOD + FADE_OUT / 2).await;
        assert_eq!(sink.take(Track::Character), vec![BubbleFrame::FadeOut]);

        time::sleep(FADE_OUT).await;
        assert_eq!(
            sink.take(Track::Character),
            vec![show("Bye", 1), BubbleFrame::FadeIn]
        );
        assert_eq!(track.resume_index(), 0);

        time::sleep(FADE_IN_SETTLE).await;
        assert_eq!(sink.take(Track::Character), vec![BubbleFrame::Settle]);

        time::sleep(ROTATION_PERIOD).await;
        let frames = sink.take(Track::Character);
        assert!(frames.contains(&show("Hi", 0)));
        assert_eq!(track.resume_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_never_leaves_two_timers() {
        let sink = Arc::new(RecordingSink::default());
        let mut track = RotationTrack::new(Track::Character, sink.clone());
        let captions = strings(&["A", "B", "C"]);

        track.start(&captions, 0);
        let resume = track.resume_index();
        track.start(&captions, resume);
        assert!(track.has_live_timer());
        sink.take(Track::Character);

        // One full advance: exactly one Show, not one per start call.
        let full_advance = ROTATION_PERIOD + FADE_OUT + FADE_IN_SETTLE;
        time::sleep(full_advance + Duration::from_millis(50)).await;
        let shows: Vec<_> = sink
            .take(Track::Character)
            .into_iter()
            .filter(|frame| matches!(frame, BubbleFrame::Show { .. }))
            .collect();
        assert_eq!(shows, vec![show("C", 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_index_continues_across_restart() {
        let sink = Arc::new(RecordingSink::default());
        let mut track = RotationTrack::new(Track::User, sink.clone());
        let captions = strings(&["A", "B", "C"]);

        track.start(&captions, 0);
        time::sleep(ROTATION_PERIOD + FADE_OUT + Duration::from_millis(10)).await;
        // A then B have been shown; C is next.
        assert_eq!(track.resume_index(), 2);

        sink.take(Track::User);
        let outcome = track.start(&captions, track.resume_index());
        assert_eq!(outcome.resume_index, 0);
        assert_eq!(sink.take(Track::User), vec![show("C", 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_mid_fade() {
        let sink = Arc::new(RecordingSink::default());
        let mut track = RotationTrack::new(Track::Character, sink.clone());

        track.start(&strings(&["A", "B"]), 0);
        time::sleep(ROTATION_PERIOD + Duration::from_millis(100)).await;
        sink.take(Track::Character);

        track.stop();
        assert_eq!(track.phase(), TrackPhase::Idle);
        assert!(!track.has_live_timer());

        time::sleep(ROTATION_PERIOD * 2).await;
        assert_eq!(sink.take(Track::Character), vec![BubbleFrame::Clear]);
    }

    #[tokio::test(start_paused = true)]
    async fn tracks_rotate_independently() {
        let sink = Arc::new(RecordingSink::default());
        let mut character = RotationTrack::new(Track::Character, sink.clone());
        let mut user = RotationTrack::new(Track::User, sink.clone());

        character.start(&strings(&["C1", "C2"]), 0);
        time::sleep(Duration::from_millis(2000)).await;
        user.start(&strings(&["U1", "U2"]), 0);

        let until_first_swap = ROTATION_PERIOD - Duration::from_millis(2000) + FADE_OUT;
        time::sleep(until_first_swap + Duration::from_millis(10)).await;
        assert!(sink.frames(Track::Character).contains(&show("C2", 1)));
        assert!(!sink.frames(Track::User).contains(&show("U2", 1)));

        character.stop();
        time::sleep(Duration::from_millis(2000)).await;
        assert!(sink.frames(Track::User).contains(&show("U2", 1)));
    }

    /// Blocks the first `FadeIn` until released, holding the timer task inside
    /// its caption swap.
    struct GatedSink {
        shows: Mutex<Vec<String>>,
        gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
    }

    impl BubbleSink for GatedSink {
        fn bubble(&self, _track: Track, frame: BubbleFrame) {
            match frame {
                BubbleFrame::Show { text, .. } => self.shows.lock().unwrap().push(text),
                BubbleFrame::FadeIn => {
                    let gate = self.gate.lock().unwrap().take();
                    if let Some((entered, release)) = gate {
                        entered.send(()).unwrap();
                        let _ = release.recv_timeout(Duration::from_secs(5));
                    }
                }
                _ => {}
            }
        }
    }

    #[test]
    fn restart_during_swap_keeps_new_rotation_in_order() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .build()
            .unwrap();
        let _entered_runtime = runtime.enter();

        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sink = Arc::new(GatedSink {
            shows: Mutex::new(Vec::new()),
            gate: Mutex::new(Some((entered_tx, release_rx))),
        });
        let timing = RotationTiming {
            period: Duration::from_millis(40),
            fade_out: Duration::from_millis(5),
            fade_in_settle: Duration::from_millis(5),
        };
        let mut track = RotationTrack::with_timing(Track::Character, sink.clone(), timing);

        track.start(&strings(&["A", "B", "C"]), 0);
        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("timer reached the swap");

        // The old task is parked mid-swap on a worker thread.
        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            release_tx.send(()).unwrap();
        });
        let outcome = track.start(&strings(&["X", "Y"]), 0);
        releaser.join().unwrap();

        assert_eq!(outcome.resume_index, 1);
        assert_eq!(track.resume_index(), 1);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while sink.shows.lock().unwrap().len() < 4 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        let shows = sink.shows.lock().unwrap().clone();
        assert_eq!(&shows[..4], ["A", "B", "X", "Y"]);

        drop(track);
    }

    #[test]
    fn rotation_without_runtime_degrades_to_first_caption() {
        let sink = Arc::new(RecordingSink::default());
        let mut track = RotationTrack::new(Track::Character, sink.clone());
        let outcome = track.start(&strings(&["A", "B"]), 1);
        assert_eq!(outcome.phase, TrackPhase::Rotating);
        assert!(!track.has_live_timer());
        assert_eq!(sink.frames(Track::Character), vec![show("B", 1)]);
    }
}
