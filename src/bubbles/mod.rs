//! Caption bubbles: the rotation state machine and the timers that drive it.

pub mod state;
pub mod track;

pub use state::{effective_captions, BubbleFrame, RotationPlan, Track, TrackPhase};
pub use track::{BubbleSink, RotationTrack, StartOutcome};
