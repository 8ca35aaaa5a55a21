//! Core types for search queries, outcomes, credentials and batch results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Output format requested from upstream proxies. Fixed — the pipeline only
/// understands JSON bodies.
pub const OUTPUT_FORMAT: &str = "json";

/// An immutable search query against the upstream proxy pool.
///
/// A reformulated query is a *new* `SearchQuery`; instances are never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    term: String,
    format: &'static str,
    engines: Option<Vec<String>>,
}

impl SearchQuery {
    /// Build a query for the given free-text term with no engine restriction.
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            format: OUTPUT_FORMAT,
            engines: None,
        }
    }

    /// Build a query restricted to an explicit engine allow-list.
    pub fn with_engines(term: impl Into<String>, engines: Vec<String>) -> Self {
        Self {
            term: term.into(),
            format: OUTPUT_FORMAT,
            engines: Some(engines),
        }
    }

    /// The free-text search term.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// The output-format marker sent to the proxy (`json`).
    pub fn format(&self) -> &str {
        self.format
    }

    /// The optional engine allow-list.
    pub fn engines(&self) -> Option<&[String]> {
        self.engines.as_deref()
    }
}

/// A successful response from one upstream proxy: the raw product records
/// plus whatever engines the proxy reported as unresponsive.
///
/// Product records are opaque to this crate — they are forwarded to the
/// generation job as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Ordered opaque product records from the proxy.
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    /// Engines the proxy reported as unresponsive: `(engine, message)` pairs.
    #[serde(default)]
    pub unresponsive_engines: Vec<(String, String)>,
    /// Explicit error code attached by the proxy, if any. The gateway treats
    /// a known non-retryable code as terminal instead of trying the next
    /// endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    /// An outcome with no results and no engine reports.
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            unresponsive_engines: Vec::new(),
            error: None,
        }
    }

    /// Whether this outcome satisfies the gateway's continuation predicate.
    pub fn is_acceptable(&self) -> bool {
        !self.results.is_empty()
    }
}

/// A short-lived bearer credential for the upstream proxy pool.
///
/// Owned exclusively by the token store; replaced (never mutated) on
/// renewal. Cloning hands out an immutable snapshot.
#[derive(Debug, Clone)]
pub struct Credential {
    token: String,
    issued_to: String,
    expires_at: Instant,
}

impl Credential {
    /// Create a credential valid for `ttl` from now.
    pub fn new(token: impl Into<String>, issued_to: impl Into<String>, ttl: Duration) -> Self {
        Self {
            token: token.into(),
            issued_to: issued_to.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    /// The opaque bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The identity this credential was issued to (issuing host).
    pub fn issued_to(&self) -> &str {
        &self.issued_to
    }

    /// Remaining validity, saturating to zero once expired.
    pub fn remaining_validity(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Whether remaining validity exceeds the renewal low-water mark.
    pub fn is_fresh(&self, low_water: Duration) -> bool {
        self.remaining_validity() > low_water
    }
}

/// Lifecycle states of an asynchronous generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted by the backend, not yet started.
    Queued,
    /// Actively generating.
    Running,
    /// Finished successfully — output is available.
    Completed,
    /// Terminated by the backend without output.
    Failed,
    /// Expired on the backend before completing.
    TimedOut,
}

impl JobStatus {
    /// Map a raw backend status string onto the job lifecycle.
    ///
    /// Unknown statuses are treated as failures — the poll loop must not
    /// spin forever on a status it cannot interpret.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "queued" => Self::Queued,
            "running" | "in_progress" => Self::Running,
            "completed" => Self::Completed,
            "expired" => Self::TimedOut,
            _ => Self::Failed,
        }
    }

    /// Whether this status ends the poll loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

/// One entry of a [`CategorizedResult`]: either the categorization payload
/// for a term or an inline error description.
///
/// Serializes to the payload itself or to `{"error": "..."}`, so batch
/// callers never need to distinguish "term failed" from "term missing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermEntry {
    /// The term's pipeline failed; the message describes why.
    Error {
        /// Human-readable failure description.
        error: String,
    },
    /// The structured categorization returned by the generation job.
    Categorized(serde_json::Value),
}

impl TermEntry {
    /// Whether this entry records a per-term failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Mapping from product-type label to categorization payload or inline error.
///
/// Built by the batch orchestrator and only handed to the caller once every
/// per-term pipeline has settled. Keyed by term, not by completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorizedResult {
    entries: BTreeMap<String, TermEntry>,
}

impl CategorizedResult {
    /// An empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the entry for one term, replacing any previous entry.
    pub fn insert(&mut self, term: impl Into<String>, entry: TermEntry) {
        self.entries.insert(term.into(), entry);
    }

    /// Look up the entry for a term.
    pub fn get(&self, term: &str) -> Option<&TermEntry> {
        self.entries.get(term)
    }

    /// Number of settled terms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no terms have settled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in term order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TermEntry)> {
        self.entries.iter()
    }
}

impl FromIterator<(String, TermEntry)> for CategorizedResult {
    fn from_iter<T: IntoIterator<Item = (String, TermEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_to_json_format_no_engines() {
        let query = SearchQuery::new("geladeira");
        assert_eq!(query.term(), "geladeira");
        assert_eq!(query.format(), "json");
        assert!(query.engines().is_none());
    }

    #[test]
    fn query_with_engine_allow_list() {
        let query =
            SearchQuery::with_engines("tablet", vec!["google".into(), "bing".into()]);
        assert_eq!(query.engines(), Some(&["google".into(), "bing".into()][..]));
    }

    #[test]
    fn outcome_acceptable_iff_results_non_empty() {
        let mut outcome = SearchOutcome::empty();
        assert!(!outcome.is_acceptable());
        outcome.results.push(serde_json::json!({"title": "Geladeira Frost Free"}));
        assert!(outcome.is_acceptable());
    }

    #[test]
    fn outcome_deserializes_wire_shape() {
        let json = r#"{
            "results": [{"title": "Sofá 3 lugares", "url": "https://zoom.com.br/x"}],
            "unresponsive_engines": [["google", "access denied"], ["bing", "timed out"]]
        }"#;
        let outcome: SearchOutcome = serde_json::from_str(json).expect("deserialize");
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.unresponsive_engines.len(), 2);
        assert_eq!(outcome.unresponsive_engines[0].0, "google");
        assert_eq!(outcome.unresponsive_engines[1].1, "timed out");
        assert!(outcome.error.is_none());
    }

    #[test]
    fn outcome_carries_explicit_proxy_error_code() {
        let outcome: SearchOutcome =
            serde_json::from_str(r#"{"error": "invalid_query"}"#).expect("deserialize");
        assert_eq!(outcome.error.as_deref(), Some("invalid_query"));
        assert!(!outcome.is_acceptable());
    }

    #[test]
    fn outcome_missing_fields_default_to_empty() {
        let outcome: SearchOutcome = serde_json::from_str("{}").expect("deserialize");
        assert!(outcome.results.is_empty());
        assert!(outcome.unresponsive_engines.is_empty());
    }

    #[test]
    fn credential_fresh_above_low_water() {
        let cred = Credential::new("tok", "proxy-a", Duration::from_secs(3600));
        assert!(cred.is_fresh(Duration::from_secs(300)));
        assert_eq!(cred.token(), "tok");
        assert_eq!(cred.issued_to(), "proxy-a");
    }

    #[test]
    fn credential_stale_at_low_water() {
        let cred = Credential::new("tok", "proxy-a", Duration::from_secs(10));
        assert!(!cred.is_fresh(Duration::from_secs(300)));
    }

    #[test]
    fn expired_credential_has_zero_validity() {
        let cred = Credential::new("tok", "proxy-a", Duration::ZERO);
        assert_eq!(cred.remaining_validity(), Duration::ZERO);
    }

    #[test]
    fn job_status_parses_backend_strings() {
        assert_eq!(JobStatus::parse("queued"), JobStatus::Queued);
        assert_eq!(JobStatus::parse("running"), JobStatus::Running);
        assert_eq!(JobStatus::parse("in_progress"), JobStatus::Running);
        assert_eq!(JobStatus::parse("completed"), JobStatus::Completed);
        assert_eq!(JobStatus::parse("expired"), JobStatus::TimedOut);
        assert_eq!(JobStatus::parse("failed"), JobStatus::Failed);
    }

    #[test]
    fn unknown_status_is_failed_not_pending() {
        assert_eq!(JobStatus::parse("requires_action"), JobStatus::Failed);
        assert!(JobStatus::parse("whatever").is_terminal());
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::TimedOut.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn term_entry_error_serializes_to_error_shape() {
        let entry = TermEntry::Error {
            error: "generation timed out".into(),
        };
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json, serde_json::json!({"error": "generation timed out"}));
        assert!(entry.is_error());
    }

    #[test]
    fn term_entry_payload_serializes_transparently() {
        let entry = TermEntry::Categorized(serde_json::json!({"categoria": "eletrodomésticos"}));
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json, serde_json::json!({"categoria": "eletrodomésticos"}));
        assert!(!entry.is_error());
    }

    #[test]
    fn categorized_result_one_entry_per_term() {
        let mut result = CategorizedResult::new();
        result.insert("geladeira", TermEntry::Categorized(serde_json::json!({"n": 3})));
        result.insert(
            "sofá",
            TermEntry::Error {
                error: "all endpoints exhausted".into(),
            },
        );
        assert_eq!(result.len(), 2);
        assert!(result.get("sofá").is_some_and(TermEntry::is_error));
        assert!(result.get("geladeira").is_some_and(|e| !e.is_error()));
        assert!(result.get("tablet").is_none());
    }

    #[test]
    fn categorized_result_serializes_as_plain_map() {
        let result: CategorizedResult = vec![
            ("tablet".to_string(), TermEntry::Categorized(serde_json::json!({"ok": true}))),
            (
                "sofá".to_string(),
                TermEntry::Error {
                    error: "timeout".into(),
                },
            ),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"sofá": {"error": "timeout"}, "tablet": {"ok": true}})
        );
    }
}
