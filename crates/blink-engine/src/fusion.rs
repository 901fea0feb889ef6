//! CV / analyzer metric fusion
//!
//! Remote analyzers estimate blink rates from sampled frames and routinely
//! inflate them. The measured scan is ground truth whenever it exists;
//! analyzer figures are only used, capped, when no measurement is
//! available, and implausible claims are flagged.

use crate::metrics::MetricSummary;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

lazy_static! {
    static ref BASELINE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)baseline[^:]*:\s*(\d+(?:\.\d+)?)\s*BPM").unwrap(),
        Regex::new(r"(?i)baseline[^:]*:\s*(\d+(?:\.\d+)?)").unwrap(),
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*BPM[^.]*baseline").unwrap(),
    ];
    static ref PEAK_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)peak[^:]*:\s*(\d+(?:\.\d+)?)\s*BPM").unwrap(),
        Regex::new(r"(?i)elevated[^:]*:\s*(\d+(?:\.\d+)?)\s*BPM").unwrap(),
        Regex::new(r"(?i)spike[^:]*:\s*(\d+(?:\.\d+)?)\s*BPM").unwrap(),
    ];
}

/// Analyzer claims above this are treated as hallucinated
const HALLUCINATION_BPM: f64 = 50.0;
/// Cap applied to analyzer-only baseline figures
const LLM_BASELINE_CAP: f64 = 40.0;
/// Cap applied to analyzer-only peak figures
const LLM_PEAK_CAP: f64 = 50.0;

/// Blink rate figures claimed in analyzer prose
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmEstimate {
    pub baseline_bpm: Option<f64>,
    pub peak_bpm: Option<f64>,
}

impl LlmEstimate {
    /// A usable estimate requires at least a baseline claim
    pub fn parsed(&self) -> bool {
        self.baseline_bpm.is_some()
    }
}

fn first_match(patterns: &[Regex], text: &str) -> Option<f64> {
    for pattern in patterns {
        if let Some(caps) = pattern.captures(text) {
            if let Ok(v) = caps[1].parse() {
                return Some(v);
            }
        }
    }
    None
}

/// Extract baseline/peak BPM claims from free-form analyzer text.
pub fn parse_llm_estimate(text: &str) -> LlmEstimate {
    if text.is_empty() {
        return LlmEstimate::default();
    }
    LlmEstimate {
        baseline_bpm: first_match(&BASELINE_PATTERNS, text),
        peak_bpm: first_match(&PEAK_PATTERNS, text),
    }
}

/// How the fused figures were chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FusionMethod {
    /// Measured scan available: its figures are authoritative
    CvGroundTruth,
    /// No measurement; analyzer figures used with hard caps
    LlmCapped,
    /// Neither side produced anything usable
    Unavailable,
}

/// Confidence in the fused figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FusionConfidence {
    High,
    Low,
    None,
}

/// Fused blink metrics with provenance flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedMetrics {
    pub bpm: f64,
    pub baseline_bpm: f64,
    pub peak_bpm: f64,
    pub cv_total_blinks: usize,
    pub llm_baseline: Option<f64>,
    pub llm_peak: Option<f64>,
    pub method: FusionMethod,
    pub confidence: FusionConfidence,
    /// Analyzer and measurement disagree by more than 2x
    pub discrepancy: bool,
    /// Analyzer claimed a physiologically implausible rate
    pub llm_hallucination: bool,
}

/// Fuse measured metrics with an analyzer's prose estimate.
///
/// `cv` is `None` when the measurement itself was unavailable (capability
/// missing or scan failed) — never when it measured zero blinks.
pub fn fuse_metrics(cv: Option<&MetricSummary>, llm_text: &str) -> FusedMetrics {
    let estimate = parse_llm_estimate(llm_text);

    let mut hallucination = false;
    if let Some(peak) = estimate.peak_bpm {
        if peak > HALLUCINATION_BPM {
            hallucination = true;
            warn!(claimed_peak = peak, "Analyzer blink hallucination detected");
        }
    }
    if let Some(baseline) = estimate.baseline_bpm {
        if baseline > HALLUCINATION_BPM {
            hallucination = true;
            warn!(claimed_baseline = baseline, "Analyzer blink hallucination detected");
        }
    }

    match cv {
        Some(summary) => {
            let mut discrepancy = false;
            if let Some(llm_baseline) = estimate.baseline_bpm {
                if summary.baseline_bpm > 0.0 {
                    let ratio = llm_baseline / summary.baseline_bpm;
                    if !(0.5..=2.0).contains(&ratio) {
                        discrepancy = true;
                        warn!(
                            cv_baseline = summary.baseline_bpm,
                            llm_baseline,
                            ratio,
                            "Blink rate discrepancy; using measured value"
                        );
                    }
                }
            }
            if let Some(llm_peak) = estimate.peak_bpm {
                if summary.peak_bpm > 0.0 && llm_peak > summary.peak_bpm * 2.0 {
                    discrepancy = true;
                    warn!(
                        cv_peak = summary.peak_bpm,
                        llm_peak,
                        "Peak blink discrepancy; using measured value"
                    );
                }
            }
            FusedMetrics {
                bpm: summary.bpm,
                baseline_bpm: summary.baseline_bpm,
                peak_bpm: summary.peak_bpm,
                cv_total_blinks: summary.total_blinks,
                llm_baseline: estimate.baseline_bpm,
                llm_peak: estimate.peak_bpm,
                method: FusionMethod::CvGroundTruth,
                confidence: FusionConfidence::High,
                discrepancy,
                llm_hallucination: hallucination,
            }
        }
        None if estimate.parsed() => {
            let baseline = estimate.baseline_bpm.unwrap_or(0.0).min(LLM_BASELINE_CAP);
            FusedMetrics {
                bpm: baseline,
                baseline_bpm: baseline,
                peak_bpm: estimate.peak_bpm.unwrap_or(0.0).min(LLM_PEAK_CAP),
                cv_total_blinks: 0,
                llm_baseline: estimate.baseline_bpm,
                llm_peak: estimate.peak_bpm,
                method: FusionMethod::LlmCapped,
                confidence: FusionConfidence::Low,
                discrepancy: false,
                llm_hallucination: hallucination,
            }
        }
        None => FusedMetrics {
            bpm: 0.0,
            baseline_bpm: 0.0,
            peak_bpm: 0.0,
            cv_total_blinks: 0,
            llm_baseline: estimate.baseline_bpm,
            llm_peak: estimate.peak_bpm,
            method: FusionMethod::Unavailable,
            confidence: FusionConfidence::None,
            discrepancy: false,
            llm_hallucination: hallucination,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> MetricSummary {
        MetricSummary {
            total_blinks: 15,
            bpm: 15.0,
            baseline_bpm: 12.0,
            peak_bpm: 20.0,
            peak_timestamp: 45.0,
            stress_window_count: 1,
        }
    }

    #[test]
    fn test_parse_baseline_and_peak() {
        let text = "Estimated baseline blink rate: 18 BPM.\nPeak elevated rate observed: 45 BPM.";
        let est = parse_llm_estimate(text);
        assert_eq!(est.baseline_bpm, Some(18.0));
        assert_eq!(est.peak_bpm, Some(45.0));
        assert!(est.parsed());
    }

    #[test]
    fn test_parse_bare_baseline() {
        let est = parse_llm_estimate("baseline: 14");
        assert_eq!(est.baseline_bpm, Some(14.0));
        assert_eq!(est.peak_bpm, None);
    }

    #[test]
    fn test_parse_nothing() {
        let est = parse_llm_estimate("the subject seemed calm throughout");
        assert!(!est.parsed());
    }

    #[test]
    fn test_cv_is_ground_truth() {
        let s = summary();
        let fused = fuse_metrics(Some(&s), "baseline: 18 BPM, peak: 44 BPM");
        assert_eq!(fused.method, FusionMethod::CvGroundTruth);
        assert_eq!(fused.baseline_bpm, 12.0);
        assert_eq!(fused.peak_bpm, 20.0);
        assert_eq!(fused.confidence, FusionConfidence::High);
        // 44 > 2 * 20: flagged but still overridden
        assert!(fused.discrepancy);
    }

    #[test]
    fn test_llm_only_capped() {
        let fused = fuse_metrics(None, "baseline: 60 BPM, peak: 90 BPM");
        assert_eq!(fused.method, FusionMethod::LlmCapped);
        assert_eq!(fused.baseline_bpm, 40.0);
        assert_eq!(fused.peak_bpm, 50.0);
        assert_eq!(fused.confidence, FusionConfidence::Low);
        assert!(fused.llm_hallucination);
    }

    #[test]
    fn test_nothing_available() {
        let fused = fuse_metrics(None, "no numbers here");
        assert_eq!(fused.method, FusionMethod::Unavailable);
        assert_eq!(fused.confidence, FusionConfidence::None);
    }

    #[test]
    fn test_agreement_no_discrepancy() {
        let s = summary();
        let fused = fuse_metrics(Some(&s), "baseline: 14 BPM, peak: 22 BPM");
        assert!(!fused.discrepancy);
        assert!(!fused.llm_hallucination);
    }
}
