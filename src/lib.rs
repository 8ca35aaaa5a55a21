//! # garimpo-search
//!
//! Resilient product-search acquisition and curation pipeline.
//!
//! This crate fronts a pool of interchangeable upstream search proxies
//! (SearXNG-style, token-gated) and an asynchronous assistant-style
//! generation backend that turns raw search hits into a structured
//! categorization. It is a library — the HTTP routing layer, input
//! validation and secret loading live with the caller.
//!
//! ## Design
//!
//! - Token-gated access: one cached short-lived credential, renewed under
//!   a critical section before it expires
//! - Failover search: the endpoint pool is tried in shuffled-but-sequential
//!   order with request jitter, for a bounded number of rounds
//! - Partial-degradation handling: when both core engines inside a proxy
//!   are being denied, the query is automatically reformulated and retried
//! - Bounded generation polling: jobs are driven to a terminal state with
//!   a fixed poll interval and a wall-clock deadline
//! - Batch isolation: per-term pipelines run concurrently; one term's
//!   failure becomes an inline error entry, never a batch abort
//!
//! ## Security
//!
//! - Bearer tokens never appear in logs or error messages
//! - Search terms are logged only at trace level

pub mod batch;
pub mod config;
pub mod degradation;
pub mod error;
pub mod gateway;
pub mod generation;
pub mod http;
pub mod pool;
pub mod proxy;
pub mod reformulate;
pub mod retry;
pub mod token;
pub mod types;

pub use batch::{BatchOrchestrator, DEFAULT_PRODUCT_TYPES};
pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use gateway::SearchGateway;
pub use generation::{GenerationConfig, GenerationJobRunner};
pub use types::{CategorizedResult, SearchOutcome, SearchQuery, TermEntry};

use generation::HttpGenerationBackend;
use proxy::{HttpProxyClient, HttpTokenIssuer};
use std::time::Duration;

fn build_pipeline(
    config: &SearchConfig,
    generation: &GenerationConfig,
) -> Result<(
    SearchGateway<HttpProxyClient, HttpTokenIssuer>,
    GenerationJobRunner<HttpGenerationBackend>,
)> {
    let gateway = SearchGateway::from_config(config)?;
    let backend = HttpGenerationBackend::new(config, generation.clone())?;
    let runner = GenerationJobRunner::new(
        backend,
        Duration::from_millis(config.poll_interval_ms),
        Duration::from_secs(config.generation_deadline_seconds),
    );
    Ok((gateway, runner))
}

/// Search one product term and return its structured categorization.
///
/// Runs the full single-item pipeline: degradation-aware failover search
/// across the configured pool, then one generation job over the raw hits.
///
/// # Errors
///
/// Any [`SearchError`] from the pipeline terminates the request:
/// [`SearchError::AuthUnavailable`] / [`SearchError::AllEndpointsExhausted`]
/// when no upstream could answer, [`SearchError::GenerationTimeout`] /
/// [`SearchError::EmptyGenerationResult`] /
/// [`SearchError::MalformedGenerationOutput`] when the categorization job
/// produced nothing usable.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> garimpo_search::Result<()> {
/// let config = garimpo_search::SearchConfig::default();
/// let generation = garimpo_search::GenerationConfig::new("sk-...", "asst_...");
/// let categorization = garimpo_search::search_single("geladeira", &config, &generation).await?;
/// println!("{categorization}");
/// # Ok(())
/// # }
/// ```
pub async fn search_single(
    term: &str,
    config: &SearchConfig,
    generation: &GenerationConfig,
) -> Result<serde_json::Value> {
    let (gateway, runner) = build_pipeline(config, generation)?;
    let outcome = gateway.search_product(term).await?;
    let payload = serde_json::json!({
        "product_type": term,
        "results": outcome.results,
    });
    runner.run_to_completion(&payload).await
}

/// Search many product terms concurrently and return one entry per term.
///
/// Per-term failures settle as inline `{error: ...}` entries; the call
/// itself only fails for invalid configuration.
///
/// # Errors
///
/// Returns [`SearchError::Config`] or [`SearchError::Http`] if the
/// pipeline cannot be constructed from `config`.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> garimpo_search::Result<()> {
/// let config = garimpo_search::SearchConfig::default();
/// let generation = garimpo_search::GenerationConfig::new("sk-...", "asst_...");
/// let terms: Vec<String> = garimpo_search::DEFAULT_PRODUCT_TYPES
///     .iter()
///     .take(10)
///     .map(|t| t.to_string())
///     .collect();
/// let result = garimpo_search::search_batch(&terms, &config, &generation).await?;
/// assert_eq!(result.len(), terms.len());
/// # Ok(())
/// # }
/// ```
pub async fn search_batch(
    terms: &[String],
    config: &SearchConfig,
    generation: &GenerationConfig,
) -> Result<CategorizedResult> {
    let (gateway, runner) = build_pipeline(config, generation)?;
    let orchestrator = BatchOrchestrator::new(&gateway, &runner);
    Ok(orchestrator.run_batch(terms).await)
}
