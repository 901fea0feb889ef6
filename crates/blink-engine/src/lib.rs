//! Blink Signal Extraction Engine
//!
//! Frame-by-frame blink detection from facial landmark geometry:
//! - Eye Aspect Ratio (EAR) computation per sampled frame
//! - Open/closed blink state machine with debounce
//! - Rate statistics: baseline, sliding-window peaks, stress windows
//! - Prompt-facing metric formatting, transcript annotation, and
//!   CV/LLM metric fusion
//!
//! One scan is a single sequential pass over a borrowed frame source.
//! Independent scans share no state and can run on separate threads.

pub mod analysis;
pub mod config;
pub mod ear;
pub mod fusion;
pub mod landmarks;
pub mod metrics;
pub mod state;
pub mod transcript;

pub use analysis::{BlinkAnalysis, BlinkEvent, RateStats, ScanDiagnostics, StressWindow};
pub use config::BlinkConfig;
pub use fusion::{
    fuse_metrics, parse_llm_estimate, FusedMetrics, FusionConfidence, FusionMethod, LlmEstimate,
};
pub use landmarks::{
    select_subject, DetectError, EyeIndices, FaceLandmarks, LandmarkDetector, SubjectPolicy,
};
pub use metrics::{format_analysis, BlinkMetrics, MetricSummary};

use frame_source::{FrameSource, MediaInfoError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Blink engine error types
#[derive(Error, Debug)]
pub enum BlinkError {
    /// The landmark detection capability could not be provided at all.
    ///
    /// Distinct from a scan that ran and observed zero blinks: callers
    /// must render "measurement unavailable", never a zero count.
    #[error("Landmark detection capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Stream metadata does not support a timed scan. Fatal for the run;
    /// no partial analysis is produced.
    #[error("Invalid media: {0}")]
    InvalidMedia(#[from] MediaInfoError),

    /// The scan was cancelled via its token
    #[error("Scan cancelled")]
    Cancelled,
}

/// Cooperative cancellation handle, checked once per sampled frame.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Blink detection engine.
///
/// Owns its detector handle for the engine's lifetime; frame sources are
/// borrowed per scan and never closed here.
pub struct BlinkEngine {
    config: BlinkConfig,
    detector: Box<dyn LandmarkDetector>,
}

impl std::fmt::Debug for BlinkEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlinkEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BlinkEngine {
    /// Create an engine from an optional detector capability.
    ///
    /// The capability check happens here, once: a missing detector is
    /// `CapabilityUnavailable` up front, never a zero-blink result later.
    pub fn new(
        config: BlinkConfig,
        detector: Option<Box<dyn LandmarkDetector>>,
    ) -> Result<Self, BlinkError> {
        let detector = detector.ok_or_else(|| {
            BlinkError::CapabilityUnavailable("no landmark detector provided".into())
        })?;
        Ok(Self { config, detector })
    }

    pub fn config(&self) -> &BlinkConfig {
        &self.config
    }

    /// Scan a video and produce its blink analysis.
    ///
    /// Single-frame read and detection failures are skipped and counted;
    /// only invalid stream metadata or cancellation abort the scan.
    pub fn scan(
        &mut self,
        source: &mut dyn FrameSource,
        cancel: &CancelToken,
    ) -> Result<BlinkAnalysis, BlinkError> {
        let info = source.info();
        info.validate()?;
        let fps = info.fps;
        let duration = info.duration_seconds();

        if self.config.multi_subject {
            info!(
                policy = ?self.config.subject_policy,
                "Multi-subject mode: selecting subject per frame"
            );
        }

        let sample_rate = self.config.sample_rate.max(1) as u64;
        let mut tracker =
            state::BlinkTracker::new(self.config.ear_threshold, self.config.min_blink_frames);
        let mut blink_events: Vec<BlinkEvent> = Vec::new();
        let mut ear_timeline: Vec<(f64, f32)> = Vec::new();
        let mut diag = ScanDiagnostics::default();

        let mut frame_num: u64 = 0;
        loop {
            let frame = match source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    frame_num += 1;
                    diag.read_errors += 1;
                    warn!(frame = frame_num, error = %e, "Skipping unreadable frame");
                    continue;
                }
            };
            frame_num += 1;

            if frame_num % sample_rate != 0 {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(BlinkError::Cancelled);
            }
            diag.frames_sampled += 1;

            let faces = match self.detector.detect(&frame) {
                Ok(faces) => faces,
                Err(e) => {
                    diag.detector_errors += 1;
                    warn!(frame = frame_num, error = %e, "Landmark detection failed for frame");
                    continue;
                }
            };
            if faces.is_empty() {
                // No face: no sample, blink state persists unchanged
                continue;
            }

            let subject = if self.config.multi_subject {
                select_subject(&faces, self.config.subject_policy)
            } else {
                Some(0)
            };
            let face = match subject.and_then(|i| faces.get(i)) {
                Some(face) => face,
                None => continue,
            };

            let ear = match ear::average_ear(face, &self.config.eye_indices) {
                Some(ear) => ear,
                None => {
                    diag.detector_errors += 1;
                    continue;
                }
            };
            diag.frames_with_face += 1;

            let timestamp = frame_num as f64 / fps;
            ear_timeline.push((timestamp, ear));

            if let Some(event) = tracker.observe(frame_num, ear, fps) {
                blink_events.push(event);
            }
        }

        diag.frames_read = frame_num;
        if !ear_timeline.is_empty() {
            let sum: f32 = ear_timeline.iter().map(|(_, e)| e).sum();
            diag.mean_ear = sum / ear_timeline.len() as f32;
            diag.min_ear = ear_timeline
                .iter()
                .map(|&(_, e)| e)
                .fold(f32::MAX, f32::min);
        }
        info!(
            avg_ear = diag.mean_ear,
            min_ear = diag.min_ear,
            face_detection_rate = diag.face_detection_rate(),
            read_errors = diag.read_errors,
            detector_errors = diag.detector_errors,
            threshold = self.config.ear_threshold,
            "Blink scan complete"
        );

        let total_blinks = blink_events.len();
        let blinks_per_minute = total_blinks as f64 / duration * 60.0;
        let stats = analysis::compute_rate_stats(&blink_events, duration);

        Ok(BlinkAnalysis {
            total_blinks,
            duration_seconds: duration,
            blinks_per_minute,
            blink_events,
            ear_timeline,
            baseline_bpm: stats.baseline_bpm,
            peak_bpm: stats.peak_bpm,
            peak_timestamp: stats.peak_timestamp,
            stress_windows: stats.stress_windows,
            diagnostics: diag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_source::{FrameReadError, MediaInfo, VideoFrame};

    /// Frame source yielding blank frames with fixed metadata.
    struct ScriptedSource {
        info: MediaInfo,
        next: u64,
        /// Frame numbers (1-based) that fail to read
        bad_frames: Vec<u64>,
    }

    impl ScriptedSource {
        fn new(frame_count: u64, fps: f64) -> Self {
            Self {
                info: MediaInfo {
                    frame_count,
                    fps,
                    width: 64,
                    height: 64,
                },
                next: 0,
                bad_frames: Vec::new(),
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn info(&self) -> MediaInfo {
            self.info
        }

        fn read_frame(&mut self) -> Result<Option<VideoFrame>, FrameReadError> {
            if self.next >= self.info.frame_count {
                return Ok(None);
            }
            self.next += 1;
            if self.bad_frames.contains(&self.next) {
                return Err(FrameReadError::Decode(self.next));
            }
            Ok(Some(VideoFrame::new(
                vec![0; 64 * 64 * 3],
                64,
                64,
                0,
                self.next - 1,
            )))
        }
    }

    /// Detector producing one face whose geometry encodes a scripted EAR
    /// per frame (indexed by read order).
    struct ScriptedDetector {
        ears: Vec<f32>,
        calls: usize,
        /// Call indices (0-based) that report no face
        absent: Vec<usize>,
    }

    impl ScriptedDetector {
        fn new(ears: Vec<f32>) -> Self {
            Self {
                ears,
                calls: 0,
                absent: Vec::new(),
            }
        }

        /// Landmarks sized so the default MediaPipe eye indices resolve to
        /// an eye of width 1.0 and vertical lid gap `ear`.
        fn face_with_ear(ear: f32) -> FaceLandmarks {
            let mut points = vec![(0.5, 0.5); 512];
            let half = ear / 2.0;
            let eyes = EyeIndices::default();
            for indices in [eyes.left, eyes.right] {
                points[indices[0]] = (0.0, 0.5);
                points[indices[1]] = (0.3, 0.5 - half);
                points[indices[2]] = (0.7, 0.5 - half);
                points[indices[3]] = (1.0, 0.5);
                points[indices[4]] = (0.7, 0.5 + half);
                points[indices[5]] = (0.3, 0.5 + half);
            }
            FaceLandmarks::new(points)
        }
    }

    impl LandmarkDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DetectError> {
            let call = self.calls;
            self.calls += 1;
            if self.absent.contains(&call) {
                return Ok(vec![]);
            }
            let ear = self.ears.get(call).copied().unwrap_or(0.35);
            Ok(vec![Self::face_with_ear(ear)])
        }
    }

    /// EAR script for `frames` frames with 2-frame closures starting at
    /// the given 1-based frame numbers.
    fn script(frames: u64, closures: &[u64]) -> Vec<f32> {
        let mut ears = vec![0.35f32; frames as usize];
        for &start in closures {
            ears[start as usize - 1] = 0.10;
            ears[start as usize] = 0.10;
        }
        ears
    }

    #[test]
    fn test_capability_unavailable() {
        let err = BlinkEngine::new(BlinkConfig::default(), None).unwrap_err();
        assert!(matches!(err, BlinkError::CapabilityUnavailable(_)));
    }

    #[test]
    fn test_invalid_media_fails_fast() {
        let detector = ScriptedDetector::new(vec![]);
        let mut engine = BlinkEngine::new(BlinkConfig::default(), Some(Box::new(detector))).unwrap();
        let mut source = ScriptedSource::new(100, 0.0);
        let err = engine.scan(&mut source, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, BlinkError::InvalidMedia(_)));
    }

    #[test]
    fn test_sixty_second_uniform_blinks() {
        // 60s at 30fps, 15 blinks uniformly at 2s, 6s, ..., 58s
        let closures: Vec<u64> = (0..15).map(|i| i * 120 + 60).collect();
        let ears = script(1800, &closures);
        let detector = ScriptedDetector::new(ears);
        let mut engine = BlinkEngine::new(BlinkConfig::default(), Some(Box::new(detector))).unwrap();
        let mut source = ScriptedSource::new(1800, 30.0);

        let analysis = engine.scan(&mut source, &CancelToken::new()).unwrap();
        assert_eq!(analysis.total_blinks, 15);
        assert!((analysis.blinks_per_minute - 15.0).abs() < 1e-9);
        assert!((analysis.duration_seconds - 60.0).abs() < 1e-9);
        // Timestamps non-decreasing
        for pair in analysis.blink_events.windows(2) {
            assert!(pair[0].timestamp_seconds <= pair[1].timestamp_seconds);
        }
    }

    #[test]
    fn test_stress_burst_produces_one_window() {
        // Baseline 10 BPM (5 blinks in first 30s at 3,9,15,21,27s), then a
        // burst of 6 blinks at 35..40s
        let mut closures: Vec<u64> = [3u64, 9, 15, 21, 27].iter().map(|s| s * 30).collect();
        closures.extend((0..6).map(|i| (35 + i) * 30));
        let ears = script(1800, &closures);
        let detector = ScriptedDetector::new(ears);
        let mut engine = BlinkEngine::new(BlinkConfig::default(), Some(Box::new(detector))).unwrap();
        let mut source = ScriptedSource::new(1800, 30.0);

        let analysis = engine.scan(&mut source, &CancelToken::new()).unwrap();
        assert_eq!(analysis.total_blinks, 11);
        assert!((analysis.baseline_bpm - 10.0).abs() < 1e-9);
        assert_eq!(analysis.stress_windows.len(), 1);
        let w = &analysis.stress_windows[0];
        assert!(w.bpm >= 15.0);
        assert!(w.start_seconds <= 35.0 && w.end_seconds >= 40.0);
    }

    #[test]
    fn test_absent_faces_preserve_state() {
        // Closure that spans frames where the face disappears mid-blink:
        // closed at frames 10-11, absent at 12-13, closed at 14, open 15.
        let mut ears = vec![0.35f32; 30];
        for f in [10usize, 11, 14] {
            ears[f - 1] = 0.10;
        }
        let mut detector = ScriptedDetector::new(ears);
        detector.absent = vec![11, 12]; // 0-based calls: frames 12, 13
        let mut engine = BlinkEngine::new(BlinkConfig::default(), Some(Box::new(detector))).unwrap();
        let mut source = ScriptedSource::new(30, 30.0);

        let analysis = engine.scan(&mut source, &CancelToken::new()).unwrap();
        // One continuous closed run from the state machine's view
        assert_eq!(analysis.total_blinks, 1);
        assert_eq!(analysis.blink_events[0].frame_number, 10);
    }

    #[test]
    fn test_read_errors_skipped() {
        let closures: Vec<u64> = vec![60];
        let ears = script(300, &closures);
        let detector = ScriptedDetector::new(ears);
        let mut engine = BlinkEngine::new(BlinkConfig::default(), Some(Box::new(detector))).unwrap();
        let mut source = ScriptedSource::new(300, 30.0);
        source.bad_frames = vec![5, 200];

        let analysis = engine.scan(&mut source, &CancelToken::new()).unwrap();
        assert_eq!(analysis.diagnostics.read_errors, 2);
        assert_eq!(analysis.total_blinks, 1);
    }

    #[test]
    fn test_cancellation() {
        let detector = ScriptedDetector::new(vec![0.35; 300]);
        let mut engine = BlinkEngine::new(BlinkConfig::default(), Some(Box::new(detector))).unwrap();
        let mut source = ScriptedSource::new(300, 30.0);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = engine.scan(&mut source, &cancel).unwrap_err();
        assert!(matches!(err, BlinkError::Cancelled));
    }

    #[test]
    fn test_sample_rate_skips_frames() {
        let detector = ScriptedDetector::new(vec![0.35; 300]);
        let config = BlinkConfig {
            sample_rate: 3,
            ..Default::default()
        };
        let mut engine = BlinkEngine::new(config, Some(Box::new(detector))).unwrap();
        let mut source = ScriptedSource::new(300, 30.0);

        let analysis = engine.scan(&mut source, &CancelToken::new()).unwrap();
        assert_eq!(analysis.diagnostics.frames_sampled, 100);
        assert_eq!(analysis.ear_timeline.len(), 100);
    }

    #[test]
    fn test_analysis_serializes() {
        let detector = ScriptedDetector::new(script(60, &[10]));
        let mut engine = BlinkEngine::new(BlinkConfig::default(), Some(Box::new(detector))).unwrap();
        let mut source = ScriptedSource::new(60, 30.0);
        let analysis = engine.scan(&mut source, &CancelToken::new()).unwrap();
        let json = serde_json::to_string(&analysis).unwrap();
        let back: BlinkAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total_blinks, analysis.total_blinks);
    }
}
