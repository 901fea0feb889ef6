//! Collapsed summary rendering for synthesis input

use crate::collapse::{CollapsedEvent, ConfidenceTier};

const BANNER: &str = "═══════════════════════════════════════════════════════════════";

/// MEDIUM entries are capped to bound downstream token cost
const MEDIUM_CAP: usize = 10;

fn section(lines: &mut Vec<String>, header: &str, events: &[&CollapsedEvent], cap: usize) {
    if events.is_empty() {
        return;
    }
    lines.push(header.to_string());
    for e in events.iter().take(cap) {
        lines.push(format!(
            "  [{}] {} sources: {}",
            e.timestamp_label,
            e.sources.len(),
            e.sources.join(", ")
        ));
    }
    lines.push(String::new());
}

/// Render the cross-source event summary prepended to synthesis input.
///
/// CRITICAL and HIGH groups are listed in full, MEDIUM capped at 10;
/// LOW groups stay programmatic-only.
pub fn generate_summary(events: &[CollapsedEvent]) -> String {
    if events.is_empty() {
        return "No significant timestamped events detected across analyses.".to_string();
    }

    let by_tier = |tier: ConfidenceTier| -> Vec<&CollapsedEvent> {
        events.iter().filter(|e| e.confidence == tier).collect()
    };

    let mut lines = vec![
        BANNER.to_string(),
        "SIGNAL COLLAPSED EVENT SUMMARY".to_string(),
        "(Events deduplicated across all analyses)".to_string(),
        BANNER.to_string(),
        String::new(),
    ];

    section(
        &mut lines,
        "*** CRITICAL HOTSPOTS (5+ analyses) ***",
        &by_tier(ConfidenceTier::Critical),
        usize::MAX,
    );
    section(
        &mut lines,
        "** HIGH CONFIDENCE EVENTS (3-4 analyses) **",
        &by_tier(ConfidenceTier::High),
        usize::MAX,
    );
    section(
        &mut lines,
        "* MEDIUM CONFIDENCE EVENTS (2 analyses) *",
        &by_tier(ConfidenceTier::Medium),
        MEDIUM_CAP,
    );

    lines.push(BANNER.to_string());
    lines.join("\n")
}
