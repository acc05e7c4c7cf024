//! Live inputs of the sampling engine and the buffer its records wait in
//!
//! - `SampleSource`: the participant's continuous valence input
//! - `PlaybackClock`: the media element's position, duration and play state
//! - `SampleBuffer`: encoded rows captured but not yet persisted

pub mod buffer;
pub mod playback;
pub mod source;

pub use buffer::SampleBuffer;
pub use playback::{PlaybackClock, SimulatedPlayback};
pub use source::{PointerHandle, PointerSource, SampleSource};
