//! Frame Source Abstractions
//!
//! Decouples the signal extraction pipeline from concrete video decoders.
//! A `FrameSource` yields decoded RGB frames in presentation order together
//! with stream metadata (fps, frame count). Decoding itself (codecs, file
//! I/O, capture devices) lives behind this boundary and is owned by the
//! caller — sources are borrowed for the duration of one scan and never
//! closed by the consumer.

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, MediaInfo};

use thiserror::Error;

/// A single frame failed to decode or read.
///
/// Always recoverable: consumers skip the frame and continue the scan.
#[derive(Error, Debug)]
pub enum FrameReadError {
    #[error("Frame {0} failed to decode")]
    Decode(u64),

    #[error("I/O error reading frame: {0}")]
    Io(String),
}

/// Stream-level metadata problems that make a scan impossible.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaInfoError {
    #[error("Non-positive fps: {0}")]
    InvalidFps(f64),

    #[error("Stream reports zero frames")]
    ZeroFrames,

    #[error("Non-positive duration: {0}s")]
    InvalidDuration(f64),
}
