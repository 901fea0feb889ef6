//! Temporal clustering and confidence assignment

use crate::extract::{EventCategory, RawEvent};
use serde::{Deserialize, Serialize};

/// Confidence tier, a pure function of the distinct-source count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
    Critical,
}

impl ConfidenceTier {
    pub fn from_source_count(distinct_sources: usize) -> Self {
        match distinct_sources {
            n if n >= 5 => ConfidenceTier::Critical,
            n if n >= 3 => ConfidenceTier::High,
            2 => ConfidenceTier::Medium,
            _ => ConfidenceTier::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceTier::Low => "LOW",
            ConfidenceTier::Medium => "MEDIUM",
            ConfidenceTier::High => "HIGH",
            ConfidenceTier::Critical => "CRITICAL",
        }
    }
}

/// Several sources pointing at the same moment, merged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollapsedEvent {
    /// Arithmetic mean of member timestamps
    pub timestamp_seconds: f64,
    /// Mean timestamp as "M:SS"
    pub timestamp_label: String,
    /// Distinct contributing source names, first-seen order
    pub sources: Vec<String>,
    /// All member descriptions, in member order
    pub descriptions: Vec<String>,
    pub confidence: ConfidenceTier,
    /// One representative description per category, up to 5 categories
    pub summary: String,
}

pub(crate) fn format_clock_label(seconds: f64) -> String {
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", mins, secs)
}

const SUMMARY_CATEGORY_CAP: usize = 5;
const SUMMARY_DESCRIPTION_CHARS: usize = 100;

fn summarize_group(group: &[RawEvent], tier: ConfidenceTier, label: &str, sources: usize) -> String {
    // One representative (first) description per category, category
    // first-seen order
    let mut seen: Vec<(EventCategory, &str)> = Vec::new();
    for event in group {
        if !seen.iter().any(|(c, _)| *c == event.category) {
            seen.push((event.category, &event.description));
        }
    }

    let mut lines = vec![format!(
        "[{}] {} - {} analyses flagged this moment:",
        tier.label(),
        label,
        sources
    )];
    for (category, description) in seen.iter().take(SUMMARY_CATEGORY_CAP) {
        let truncated: String = description.chars().take(SUMMARY_DESCRIPTION_CHARS).collect();
        lines.push(format!("[{}] {}", category.label(), truncated));
    }
    lines.join("\n")
}

/// Collapse extracted events into confidence-ranked composite events.
///
/// Grouping is greedy and anchored: an event joins the current group while
/// it lies within `time_window` seconds of the group's *first* member, so
/// a dense run can span more than one window. Output is ordered by
/// confidence tier (highest first), then timestamp.
pub fn collapse_events(mut events: Vec<RawEvent>, time_window: f64) -> Vec<CollapsedEvent> {
    if events.is_empty() {
        return Vec::new();
    }
    events.sort_by(|a, b| a.timestamp_seconds.total_cmp(&b.timestamp_seconds));

    let mut groups: Vec<Vec<RawEvent>> = Vec::new();
    let mut current: Vec<RawEvent> = Vec::new();
    for event in events {
        match current.first() {
            Some(anchor) if event.timestamp_seconds - anchor.timestamp_seconds <= time_window => {
                current.push(event);
            }
            Some(_) => {
                groups.push(std::mem::take(&mut current));
                current.push(event);
            }
            None => current.push(event),
        }
    }
    groups.push(current);

    let mut collapsed: Vec<CollapsedEvent> = groups
        .iter()
        .map(|group| {
            let mut sources: Vec<String> = Vec::new();
            for event in group {
                if !sources.contains(&event.source) {
                    sources.push(event.source.clone());
                }
            }
            let tier = ConfidenceTier::from_source_count(sources.len());
            let mean_ts = group.iter().map(|e| e.timestamp_seconds).sum::<f64>()
                / group.len() as f64;
            let label = format_clock_label(mean_ts);
            let summary = summarize_group(group, tier, &label, sources.len());

            CollapsedEvent {
                timestamp_seconds: mean_ts,
                timestamp_label: label,
                sources,
                descriptions: group.iter().map(|e| e.description.clone()).collect(),
                confidence: tier,
                summary,
            }
        })
        .collect();

    collapsed.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then(a.timestamp_seconds.total_cmp(&b.timestamp_seconds))
    });
    collapsed
}
