//! Landmark detector capability and subject selection

use frame_source::VideoFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Landmark detection failed for one frame.
///
/// Recoverable: the scan skips the frame and continues.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Landmark inference failed: {0}")]
    Inference(String),

    #[error("Frame rejected by detector: {0}")]
    BadFrame(String),
}

/// One detected face: an indexed set of normalized 2D landmark points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceLandmarks {
    points: Vec<(f32, f32)>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<(f32, f32)>) -> Self {
        Self { points }
    }

    /// Point at a detector-specific landmark index
    pub fn point(&self, idx: usize) -> Option<(f32, f32)> {
        self.points.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Mean x coordinate over all landmarks, used for left/right selection
    pub fn mean_x(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().map(|p| p.0).sum::<f32>() / self.points.len() as f32
    }

    /// Area of the landmark bounding box, used for largest-face selection
    pub fn bounding_area(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        let mut min_x = f32::MAX;
        let mut max_x = f32::MIN;
        let mut min_y = f32::MAX;
        let mut max_y = f32::MIN;
        for &(x, y) in &self.points {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
        (max_x - min_x) * (max_y - min_y)
    }
}

/// Per-frame facial landmark detection capability.
///
/// Implementations wrap a face-mesh model. Zero results means no face was
/// visible; more than one result is possible in multi-subject footage.
pub trait LandmarkDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DetectError>;
}

/// The 6 landmark indices per eye, ordered: outer corner, upper-outer,
/// upper-inner, inner corner, lower-inner, lower-outer.
///
/// Defaults are the MediaPipe Face Mesh indices; other detectors supply
/// their own mapping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EyeIndices {
    pub left: [usize; 6],
    pub right: [usize; 6],
}

impl Default for EyeIndices {
    fn default() -> Self {
        Self {
            left: [362, 385, 387, 263, 373, 380],
            right: [33, 160, 158, 133, 153, 144],
        }
    }
}

/// How to pick the subject when more than one face is detected.
///
/// Selection is re-derived independently on every frame; no cross-frame
/// identity tracking is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectPolicy {
    /// Leftmost face by mean landmark x
    Leftmost,
    /// Rightmost face by mean landmark x (interview default: the
    /// interviewee usually sits camera-right)
    Rightmost,
    /// Face with the largest landmark bounding box
    Largest,
    /// Externally specified subject index, clamped to the detected count
    Speaker(usize),
}

impl Default for SubjectPolicy {
    fn default() -> Self {
        SubjectPolicy::Rightmost
    }
}

/// Deterministically select one face index per the active policy.
///
/// Ties resolve to the lowest index. Returns `None` only for an empty slice.
pub fn select_subject(faces: &[FaceLandmarks], policy: SubjectPolicy) -> Option<usize> {
    if faces.is_empty() {
        return None;
    }
    if faces.len() == 1 {
        return Some(0);
    }
    let idx = match policy {
        SubjectPolicy::Leftmost => pick_by(faces, |f| f.mean_x(), false),
        SubjectPolicy::Rightmost => pick_by(faces, |f| f.mean_x(), true),
        SubjectPolicy::Largest => pick_by(faces, |f| f.bounding_area(), true),
        SubjectPolicy::Speaker(i) => i.min(faces.len() - 1),
    };
    Some(idx)
}

fn pick_by<F: Fn(&FaceLandmarks) -> f32>(faces: &[FaceLandmarks], key: F, max: bool) -> usize {
    let mut best = 0;
    let mut best_key = key(&faces[0]);
    for (i, face) in faces.iter().enumerate().skip(1) {
        let k = key(face);
        let better = if max {
            k.total_cmp(&best_key).is_gt()
        } else {
            k.total_cmp(&best_key).is_lt()
        };
        if better {
            best = i;
            best_key = k;
        }
    }
    best
}
