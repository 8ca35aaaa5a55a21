//! Detection of partially-degraded engines inside a proxy response.
//!
//! An upstream proxy can be reachable while individual engines behind it
//! are being denied or timing out. The proxy reports those as
//! `unresponsive_engines` pairs; this module matches the report messages
//! against known denial/timeout phrases. An engine counts as degraded only
//! when a phrase is actually present in its message — a report with an
//! unrelated message keeps the engine in good standing.

use crate::types::SearchOutcome;
use std::collections::HashSet;

/// The two engines that carry product search; both degraded at once is the
/// signal to reformulate the query instead of surfacing partial results.
pub const CORE_ENGINES: [&str; 2] = ["google", "bing"];

/// Denial/timeout phrases matched case-insensitively against report messages.
const DEGRADATION_PHRASES: &[&str] = &[
    "denied",
    "blocked",
    "forbidden",
    "timed out",
    "timeout",
    "too many requests",
    "rate limit",
    "captcha",
    "suspended",
];

/// Whether a single report message signals denial or timeout.
fn message_is_degraded(message: &str) -> bool {
    let message = message.to_lowercase();
    DEGRADATION_PHRASES
        .iter()
        .any(|phrase| message.contains(phrase))
}

/// Engine identifiers (lowercased) whose unresponsive report matches a
/// denial/timeout phrase.
pub fn degraded_engines(outcome: &SearchOutcome) -> HashSet<String> {
    outcome
        .unresponsive_engines
        .iter()
        .filter(|(_, message)| message_is_degraded(message))
        .map(|(engine, _)| engine.to_lowercase())
        .collect()
}

/// Whether both core engines are degraded simultaneously.
pub fn core_pair_degraded(degraded: &HashSet<String>) -> bool {
    CORE_ENGINES.iter().all(|engine| degraded.contains(*engine))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome_with_reports(reports: &[(&str, &str)]) -> SearchOutcome {
        SearchOutcome {
            results: vec![serde_json::json!({"title": "x"})],
            unresponsive_engines: reports
                .iter()
                .map(|(e, m)| (e.to_string(), m.to_string()))
                .collect(),
            error: None,
        }
    }

    #[test]
    fn no_reports_means_no_degradation() {
        let degraded = degraded_engines(&SearchOutcome::empty());
        assert!(degraded.is_empty());
        assert!(!core_pair_degraded(&degraded));
    }

    #[test]
    fn denial_phrases_match_case_insensitively() {
        let outcome = outcome_with_reports(&[
            ("google", "Access DENIED by upstream"),
            ("bing", "request Timed Out after 5s"),
        ]);
        let degraded = degraded_engines(&outcome);
        assert!(degraded.contains("google"));
        assert!(degraded.contains("bing"));
    }

    #[test]
    fn unrelated_message_does_not_degrade() {
        // Regression pin: a report whose message carries no denial/timeout
        // phrase must not count as degraded.
        let outcome = outcome_with_reports(&[("google", "engine returned zero results")]);
        assert!(degraded_engines(&outcome).is_empty());
    }

    #[test]
    fn engine_ids_are_lowercased() {
        let outcome = outcome_with_reports(&[("Google", "blocked by CAPTCHA")]);
        let degraded = degraded_engines(&outcome);
        assert!(degraded.contains("google"));
    }

    #[test]
    fn single_core_engine_is_not_the_pair_signal() {
        let outcome = outcome_with_reports(&[("google", "too many requests")]);
        let degraded = degraded_engines(&outcome);
        assert_eq!(degraded.len(), 1);
        assert!(!core_pair_degraded(&degraded));
    }

    #[test]
    fn both_core_engines_trigger_the_pair_signal() {
        let outcome = outcome_with_reports(&[
            ("google", "suspended: rate limit exceeded"),
            ("bing", "connection timeout"),
            ("duckduckgo", "ok but slow"),
        ]);
        let degraded = degraded_engines(&outcome);
        assert!(core_pair_degraded(&degraded));
        assert!(!degraded.contains("duckduckgo"));
    }

    #[test]
    fn non_core_degradation_alone_is_ignored() {
        let outcome = outcome_with_reports(&[
            ("duckduckgo", "blocked"),
            ("qwant", "forbidden"),
        ]);
        let degraded = degraded_engines(&outcome);
        assert_eq!(degraded.len(), 2);
        assert!(!core_pair_degraded(&degraded));
    }
}
