//! Timestamp token recognition
//!
//! Recognized literal forms inside free text: `M:SS`, `H:MM:SS`, ranges
//! (`0:32-0:35`, start wins), optional `~`/`@` approximation prefixes,
//! and `Ns` / `NmNs`. Anything else is not a timestamp.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Matches timestamp tokens in running prose
    pub(crate) static ref TIMESTAMP_TOKEN: Regex = Regex::new(
        r"[~@]?(?:\d{1,2}:\d{2}(?::\d{2})?(?:-\d{1,2}:\d{2}(?::\d{2})?)?|\d+m\d+s|\d+s)"
    )
    .unwrap();
}

/// Convert one recognized token to total seconds.
///
/// Returns `None` for malformed numeric content; callers drop the token
/// and keep scanning.
pub fn parse_timestamp(token: &str) -> Option<f64> {
    parse_inner(token).filter(|s| s.is_finite() && *s >= 0.0)
}

fn parse_inner(token: &str) -> Option<f64> {
    let mut ts = token.trim();
    ts = ts.trim_start_matches(['~', '@']);

    // Ranges use their start
    if let Some((start, _)) = ts.split_once('-') {
        ts = start.trim();
    }

    if ts.contains(':') {
        let parts: Vec<&str> = ts.split(':').collect();
        return match parts.as_slice() {
            [m, s] => {
                let mins: f64 = m.parse().ok()?;
                let secs: f64 = s.trim_end_matches('s').parse().ok()?;
                Some(mins * 60.0 + secs)
            }
            [h, m, s] => {
                let hours: f64 = h.parse().ok()?;
                let mins: f64 = m.parse().ok()?;
                let secs: f64 = s.trim_end_matches('s').parse().ok()?;
                Some(hours * 3600.0 + mins * 60.0 + secs)
            }
            _ => None,
        };
    }

    let lower = ts.to_lowercase();
    if lower.ends_with('s') {
        let body = lower.trim_end_matches('s');
        if let Some((m, s)) = body.split_once('m') {
            let mins: f64 = m.parse().ok()?;
            let secs: f64 = if s.is_empty() { 0.0 } else { s.parse().ok()? };
            return Some(mins * 60.0 + secs);
        }
        return body.parse().ok();
    }

    None
}
