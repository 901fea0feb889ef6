//! Blink analysis results and rate statistics

use serde::{Deserialize, Serialize};

/// A single completed blink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlinkEvent {
    /// Timestamp of the closed run's first frame
    pub timestamp_seconds: f64,
    /// Frame number of the closed run's first frame
    pub frame_number: u64,
    /// EAR observed at the reopening frame
    pub ear_value: f32,
}

/// A window whose local blink rate exceeded 1.5x baseline
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StressWindow {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub bpm: f64,
}

/// Baseline, peak, and stress windows derived from the event sequence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateStats {
    /// BPM over the first 30 seconds (or the whole video if shorter)
    pub baseline_bpm: f64,
    /// Highest BPM over any sliding window
    pub peak_bpm: f64,
    /// Midpoint of the peak window
    pub peak_timestamp: f64,
    /// Windows above 1.5x baseline. Overlapping flagged windows are kept
    /// separate; downstream consumers depend on window-count semantics.
    pub stress_windows: Vec<StressWindow>,
}

/// Sliding window width in seconds
const WINDOW_SIZE: f64 = 30.0;
/// Sliding window step in seconds
const WINDOW_STEP: u64 = 15;
/// Baseline period in seconds
const BASELINE_PERIOD: f64 = 30.0;
/// Stress flagging multiplier over baseline (strict inequality)
const STRESS_RATIO: f64 = 1.5;

/// Compute rate statistics over a complete, timestamp-ordered event
/// sequence.
///
/// `duration_seconds` must be positive (the scan fails fast before events
/// exist otherwise).
pub fn compute_rate_stats(events: &[BlinkEvent], duration_seconds: f64) -> RateStats {
    let overall_bpm = if duration_seconds > 0.0 {
        events.len() as f64 / duration_seconds * 60.0
    } else {
        0.0
    };

    let baseline_count = events
        .iter()
        .filter(|e| e.timestamp_seconds <= BASELINE_PERIOD)
        .count();
    let baseline_duration = duration_seconds.min(BASELINE_PERIOD);
    let baseline_bpm = if baseline_duration > 0.0 {
        baseline_count as f64 / baseline_duration * 60.0
    } else {
        overall_bpm
    };

    let mut peak_bpm = 0.0;
    let mut peak_timestamp = 0.0;
    let mut stress_windows = Vec::new();

    let mut window_start = 0u64;
    while (window_start as f64) < duration_seconds {
        let start = window_start as f64;
        let end = (start + WINDOW_SIZE).min(duration_seconds);
        let count = events
            .iter()
            .filter(|e| e.timestamp_seconds >= start && e.timestamp_seconds < end)
            .count();
        let window_duration = end - start;
        let bpm = if window_duration > 0.0 {
            count as f64 / window_duration * 60.0
        } else {
            0.0
        };

        if bpm > peak_bpm {
            peak_bpm = bpm;
            peak_timestamp = start + WINDOW_SIZE / 2.0;
        }

        if baseline_bpm > 0.0 && bpm > baseline_bpm * STRESS_RATIO {
            stress_windows.push(StressWindow {
                start_seconds: start,
                end_seconds: end,
                bpm,
            });
        }

        window_start += WINDOW_STEP;
    }

    RateStats {
        baseline_bpm,
        peak_bpm,
        peak_timestamp,
        stress_windows,
    }
}

/// Per-scan completeness diagnostics.
///
/// These never affect correctness of the aggregate, only completeness;
/// they are logged at end of scan and carried for callers that want to
/// qualify the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanDiagnostics {
    /// Frames read from the source (including read failures)
    pub frames_read: u64,
    /// Frames actually sampled per the sample rate
    pub frames_sampled: u64,
    /// Sampled frames with a usable face
    pub frames_with_face: u64,
    /// Frames dropped on read error
    pub read_errors: u64,
    /// Frames dropped on detector error or missing eye landmarks
    pub detector_errors: u64,
    /// Mean EAR across the timeline
    pub mean_ear: f32,
    /// Minimum EAR across the timeline
    pub min_ear: f32,
}

impl ScanDiagnostics {
    /// Fraction of sampled frames where a face was found, in percent
    pub fn face_detection_rate(&self) -> f64 {
        if self.frames_sampled == 0 {
            return 0.0;
        }
        self.frames_with_face as f64 / self.frames_sampled as f64 * 100.0
    }
}

/// Complete result of one blink detection scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlinkAnalysis {
    pub total_blinks: usize,
    pub duration_seconds: f64,
    /// Overall blinks per minute across the whole video
    pub blinks_per_minute: f64,
    /// All blink events, ascending by timestamp
    pub blink_events: Vec<BlinkEvent>,
    /// (timestamp, EAR) for every sampled frame with a face
    pub ear_timeline: Vec<(f64, f32)>,
    pub baseline_bpm: f64,
    pub peak_bpm: f64,
    pub peak_timestamp: f64,
    pub stress_windows: Vec<StressWindow>,
    pub diagnostics: ScanDiagnostics,
}
