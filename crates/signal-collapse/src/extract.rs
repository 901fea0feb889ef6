//! Per-line event extraction and categorization

use crate::timestamp::{parse_timestamp, TIMESTAMP_TOKEN};
use serde::{Deserialize, Serialize};

/// Behavioral event category, assigned by keyword matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    Ocular,
    Gesture,
    Expression,
    Vocal,
    Posture,
    StressMarker,
    DeceptionIndicator,
    Behavioral,
}

impl EventCategory {
    pub fn label(&self) -> &'static str {
        match self {
            EventCategory::Ocular => "OCULAR",
            EventCategory::Gesture => "GESTURE",
            EventCategory::Expression => "EXPRESSION",
            EventCategory::Vocal => "VOCAL",
            EventCategory::Posture => "POSTURE",
            EventCategory::StressMarker => "STRESS_MARKER",
            EventCategory::DeceptionIndicator => "DECEPTION_INDICATOR",
            EventCategory::Behavioral => "BEHAVIORAL",
        }
    }
}

/// Ordered rule table; the first rule with any matching keyword wins.
const CATEGORY_RULES: &[(&[&str], EventCategory)] = &[
    (&["blink", "eye", "gaze", "pupil"], EventCategory::Ocular),
    (
        &["hand", "gesture", "arm", "finger", "touch"],
        EventCategory::Gesture,
    ),
    (
        &["smile", "frown", "expression", "micro", "facs", "au"],
        EventCategory::Expression,
    ),
    (
        &["voice", "pitch", "pause", "speech", "vocal", "tone"],
        EventCategory::Vocal,
    ),
    (
        &["posture", "lean", "body", "shoulder", "head"],
        EventCategory::Posture,
    ),
    (
        &["stress", "anxiety", "tension", "load"],
        EventCategory::StressMarker,
    ),
    (
        &["decept", "lie", "fabricat", "incongruent"],
        EventCategory::DeceptionIndicator,
    ),
];

/// Classify a line by case-insensitive keyword substrings.
pub fn classify(description: &str) -> EventCategory {
    let lower = description.to_lowercase();
    for (keywords, category) in CATEGORY_RULES {
        if keywords.iter().any(|k| lower.contains(k)) {
            return *category;
        }
    }
    EventCategory::Behavioral
}

/// One timestamped observation extracted from a single source's text.
///
/// Ephemeral: consumed immediately by collapsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub timestamp_seconds: f64,
    pub source: String,
    pub description: String,
    pub category: EventCategory,
}

/// Extract one event per recognized timestamp token per line.
///
/// The description is the full trimmed line; unparseable tokens are
/// dropped while the rest of the line is still scanned.
pub fn extract_events(text: &str, source: &str) -> Vec<RawEvent> {
    let mut events = Vec::new();
    for line in text.split('\n') {
        for token in TIMESTAMP_TOKEN.find_iter(line) {
            if let Some(ts) = parse_timestamp(token.as_str()) {
                let description = line.trim().to_string();
                events.push(RawEvent {
                    timestamp_seconds: ts,
                    source: source.to_string(),
                    category: classify(&description),
                    description,
                });
            }
        }
    }
    events
}
