//! Prompt-facing metric formatting
//!
//! Renders a scan into the human-readable block injected into downstream
//! prompts as measured ground truth, plus the raw numeric summary. The
//! unavailable state is explicit: consumers must be able to tell "no
//! measurement at all" from "measured zero blinks".

use crate::analysis::{BlinkAnalysis, BlinkEvent};
use serde::{Deserialize, Serialize};

const BANNER: &str = "═══════════════════════════════════════════════════════════════";

/// Blinks within this many seconds of a cluster's first blink
const CLUSTER_SPAN: f64 = 5.0;
/// Minimum blinks for a reportable cluster
const CLUSTER_MIN: usize = 3;

/// Numeric summary fields for prompt interpolation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSummary {
    pub total_blinks: usize,
    pub bpm: f64,
    pub baseline_bpm: f64,
    pub peak_bpm: f64,
    pub peak_timestamp: f64,
    pub stress_window_count: usize,
}

/// Prompt-ready blink metrics, available or explicitly not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlinkMetrics {
    pub available: bool,
    pub formatted_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<MetricSummary>,
}

impl BlinkMetrics {
    pub fn from_analysis(analysis: &BlinkAnalysis) -> Self {
        Self {
            available: true,
            formatted_text: format_analysis(analysis),
            summary: Some(MetricSummary {
                total_blinks: analysis.total_blinks,
                bpm: analysis.blinks_per_minute,
                baseline_bpm: analysis.baseline_bpm,
                peak_bpm: analysis.peak_bpm,
                peak_timestamp: analysis.peak_timestamp,
                stress_window_count: analysis.stress_windows.len(),
            }),
        }
    }

    /// Measurement could not be taken at all
    pub fn unavailable(reason: &str) -> Self {
        Self {
            available: false,
            formatted_text: format!("Blink rate measurement unavailable ({reason})"),
            summary: None,
        }
    }
}

/// Format a full analysis as the validated-measurement prompt block.
pub fn format_analysis(analysis: &BlinkAnalysis) -> String {
    let mut lines = vec![
        BANNER.to_string(),
        "CV-VALIDATED BLINK RATE ANALYSIS".to_string(),
        BANNER.to_string(),
        String::new(),
        format!("Total Blinks Detected: {}", analysis.total_blinks),
        format!("Video Duration: {:.1} seconds", analysis.duration_seconds),
        format!("Overall Blink Rate: {:.1} BPM", analysis.blinks_per_minute),
        String::new(),
        format!("Baseline BPM (first 30s): {:.1}", analysis.baseline_bpm),
        format!(
            "Peak BPM: {:.1} at ~{:.0}s",
            analysis.peak_bpm, analysis.peak_timestamp
        ),
    ];
    if analysis.baseline_bpm > 0.0 {
        lines.push(format!(
            "Peak vs Baseline: {:.0}%",
            analysis.peak_bpm / analysis.baseline_bpm * 100.0
        ));
    }
    lines.push(String::new());

    if !analysis.stress_windows.is_empty() {
        lines.push("STRESS WINDOWS (>150% baseline):".to_string());
        for w in analysis.stress_windows.iter().take(5) {
            lines.push(format!(
                "  [{:.0}s - {:.0}s]: {:.1} BPM",
                w.start_seconds, w.end_seconds, w.bpm
            ));
        }
        lines.push(String::new());
    }

    let clusters = find_clusters(&analysis.blink_events);
    if !clusters.is_empty() {
        lines.push("BLINK CLUSTERS (investigate these moments):".to_string());
        for (start, end, count) in clusters.iter().take(5) {
            lines.push(format!(
                "  [{:.1}s - {:.1}s]: {} blinks in {:.1}s",
                start,
                end,
                count,
                end - start
            ));
        }
    }

    lines.push(BANNER.to_string());
    lines.join("\n")
}

/// Runs of `CLUSTER_MIN`+ blinks within `CLUSTER_SPAN` seconds of the
/// first blink in the run. Returns (start, end, count).
fn find_clusters(events: &[BlinkEvent]) -> Vec<(f64, f64, usize)> {
    let mut clusters = Vec::new();
    let mut i = 0;
    while i < events.len() {
        let cluster_start = events[i].timestamp_seconds;
        let mut j = i + 1;
        while j < events.len() && events[j].timestamp_seconds - cluster_start <= CLUSTER_SPAN {
            j += 1;
        }
        let count = j - i;
        if count >= CLUSTER_MIN {
            clusters.push((cluster_start, events[j - 1].timestamp_seconds, count));
            i = j;
        } else {
            i += 1;
        }
    }
    clusters
}
