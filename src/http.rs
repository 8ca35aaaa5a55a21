//! Shared HTTP client construction and request jitter.
//!
//! Provides a configured [`reqwest::Client`] with a per-call timeout and
//! rotating User-Agent strings, plus the jitter sampler the gateway uses
//! to spread request timing across the endpoint pool.

use crate::config::SearchConfig;
use crate::error::SearchError;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Realistic browser User-Agent strings, rotated per client.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:134.0) Gecko/20100101 Firefox/134.0",
];

/// Build a [`reqwest::Client`] for proxy and generation API requests.
///
/// The client has:
/// - Timeout from config, applied to every call it issues
/// - Random User-Agent from the built-in rotation list (or custom if configured)
/// - A small redirect limit — proxies answer directly, long chains are suspect
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    let ua = match config.user_agent {
        Some(ref custom) => custom.clone(),
        None => random_user_agent().to_owned(),
    };

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(4))
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Sample a pre-request delay from the configured `(min, max)` millisecond
/// range. A degenerate range returns its lower bound.
pub fn sample_jitter(range_ms: (u64, u64)) -> Duration {
    let (min, max) = range_ms;
    if min >= max {
        return Duration::from_millis(min);
    }
    let ms = rand::thread_rng().gen_range(min..=max);
    Duration::from_millis(ms)
}
