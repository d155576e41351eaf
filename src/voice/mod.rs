//! Voice test engine: the single-slot asynchronous job and its lifecycle.

pub mod engine;
pub mod synth;

pub use engine::{EngineStatus, JobState, VoiceTestEngine};
pub use synth::synthesize_result;
