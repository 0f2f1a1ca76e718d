//! Audio input: decoding, downmixing and resampling to a fixed-length clip

pub mod loader;

pub use loader::{SignalLoader, Waveform};
