//! Frame source trait and stream metadata

use crate::frame::VideoFrame;
use crate::{FrameReadError, MediaInfoError};
use serde::{Deserialize, Serialize};

/// Stream-level metadata reported by a frame source
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Total number of frames in the stream
    pub frame_count: u64,
    /// Constant frame rate
    pub fps: f64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl MediaInfo {
    /// Stream duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            0.0
        }
    }

    /// Check that the stream metadata supports a timed scan.
    ///
    /// Scans fail fast on invalid metadata rather than producing an
    /// analysis with meaningless timestamps.
    pub fn validate(&self) -> Result<(), MediaInfoError> {
        if self.fps <= 0.0 {
            return Err(MediaInfoError::InvalidFps(self.fps));
        }
        if self.frame_count == 0 {
            return Err(MediaInfoError::ZeroFrames);
        }
        let duration = self.duration_seconds();
        if duration <= 0.0 {
            return Err(MediaInfoError::InvalidDuration(duration));
        }
        Ok(())
    }
}

/// Sequential source of decoded video frames.
///
/// Implementations wrap a decoder or capture device. The consumer reads
/// until `Ok(None)` (end of stream); a `FrameReadError` covers exactly one
/// frame and the next read is expected to succeed or hit end of stream.
pub trait FrameSource {
    /// Stream metadata, available before any frame is read
    fn info(&self) -> MediaInfo;

    /// Read the next frame in presentation order
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, FrameReadError>;
}
