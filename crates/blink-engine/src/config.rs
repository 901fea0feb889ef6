//! Blink engine configuration

use crate::landmarks::{EyeIndices, SubjectPolicy};
use serde::{Deserialize, Serialize};

/// Blink detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlinkConfig {
    /// EAR below this value counts as a closed eye
    pub ear_threshold: f32,

    /// Minimum consecutive closed frames for a valid blink.
    ///
    /// The default of 1 counts any single-frame closure. It was tuned
    /// against one specific detector's noise floor; raise it when a
    /// different detector produces spurious sub-threshold frames.
    pub min_blink_frames: u32,

    /// Process every Nth frame (1 = all frames)
    pub sample_rate: u32,

    /// Track multiple faces and select the subject per `subject_policy`
    pub multi_subject: bool,

    /// Subject selection when more than one face is detected
    pub subject_policy: SubjectPolicy,

    /// Landmark index mapping for the active detector
    pub eye_indices: EyeIndices,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            min_blink_frames: 1,
            sample_rate: 1,
            multi_subject: false,
            subject_policy: SubjectPolicy::default(),
            eye_indices: EyeIndices::default(),
        }
    }
}

impl BlinkConfig {
    /// Interview footage: two faces expected, subject camera-right
    pub fn interview() -> Self {
        Self {
            multi_subject: true,
            subject_policy: SubjectPolicy::Rightmost,
            ..Default::default()
        }
    }

    /// Faster scan for long footage: every 2nd frame, 2-frame debounce
    pub fn fast() -> Self {
        Self {
            sample_rate: 2,
            min_blink_frames: 2,
            ..Default::default()
        }
    }
}
