//! Signal Collapsing Layer
//!
//! Merges independently-produced, approximately-co-timed behavioral
//! observations from multiple analyzer outputs into deduplicated composite
//! events:
//! - Timestamp tokens extracted from free prose, one event per token
//! - Keyword categorization (ocular, gesture, expression, ...)
//! - Greedy temporal clustering within a window of each group's first event
//! - Confidence tier from the distinct-source count
//!
//! Pure in-memory computation, no I/O; malformed or empty input degrades
//! to "no events extracted", never an error.

pub mod collapse;
pub mod extract;
pub mod summary;
pub mod timestamp;

pub use collapse::{CollapsedEvent, ConfidenceTier};
pub use extract::{classify, extract_events, EventCategory, RawEvent};
pub use summary::generate_summary;
pub use timestamp::parse_timestamp;

use std::collections::HashMap;
use tracing::debug;

/// Collapsing configuration
#[derive(Debug, Clone)]
pub struct CollapseConfig {
    /// Seconds within which events count as the same moment, measured
    /// from each group's first event
    pub time_window: f64,
}

impl Default for CollapseConfig {
    fn default() -> Self {
        Self { time_window: 2.0 }
    }
}

/// Event collapsing engine
#[derive(Debug, Clone, Default)]
pub struct EventCollapser {
    config: CollapseConfig,
}

impl EventCollapser {
    pub fn new(config: CollapseConfig) -> Self {
        Self { config }
    }

    /// Collapse all analyzer outputs into a summary string plus the full
    /// ordered event sequence.
    ///
    /// Sources are processed in sorted-name order so results are
    /// deterministic regardless of map iteration order.
    pub fn collapse(&self, sources: &HashMap<String, String>) -> (String, Vec<CollapsedEvent>) {
        let mut names: Vec<&String> = sources.keys().collect();
        names.sort();

        let mut events: Vec<RawEvent> = Vec::new();
        for name in names {
            let extracted = extract_events(&sources[name], name);
            debug!(source = %name, events = extracted.len(), "Extracted timestamped events");
            events.extend(extracted);
        }

        let collapsed = collapse::collapse_events(events, self.config.time_window);
        let summary = generate_summary(&collapsed);
        (summary, collapsed)
    }
}
