//! Asynchronous generation job: submission and bounded polling.
//!
//! The categorization step runs as an assistant-style job on a remote
//! backend: create a conversation thread, append the payload as a single
//! user message, start a run against the thread, then poll the run status
//! on a fixed interval until it completes or a wall-clock deadline
//! (measured from submission, independent of per-call timeouts) elapses.
//! The completed thread's newest assistant text segment is the job's
//! output, expected to be a serialized JSON payload.

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::http;
use crate::types::JobStatus;
use serde::Deserialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Handle to a submitted generation job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    /// Conversation thread the payload was appended to.
    pub thread_id: String,
    /// The run executing against the thread.
    pub run_id: String,
}

/// One message of a conversation thread, newest-first as listed by the
/// backend. Only the text segments matter here.
#[derive(Debug, Clone)]
pub struct ThreadMessage {
    /// Author role (`user` or `assistant`).
    pub role: String,
    /// Text segments in message order.
    pub segments: Vec<String>,
}

/// The remote generation backend's thread/run operations.
///
/// [`HttpGenerationBackend`] is the real implementation; tests script the
/// status sequence through mocks.
pub trait GenerationBackend: Send + Sync {
    /// Create a new conversation thread, returning its id.
    fn create_thread(&self) -> impl Future<Output = Result<String>> + Send;

    /// Append a user message to the thread.
    fn append_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Start a run against the thread, returning the run id.
    fn start_run(&self, thread_id: &str) -> impl Future<Output = Result<String>> + Send;

    /// Fetch the current status of a run.
    fn run_status(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> impl Future<Output = Result<JobStatus>> + Send;

    /// List the thread's messages, newest first.
    fn list_messages(
        &self,
        thread_id: &str,
    ) -> impl Future<Output = Result<Vec<ThreadMessage>>> + Send;
}

/// Connection settings for the assistant-style generation API.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL (defaults to `https://api.openai.com/v1`).
    pub base_url: String,
    /// The assistant that performs the categorization.
    pub assistant_id: String,
}

impl GenerationConfig {
    /// Create a config with the given API key and assistant.
    pub fn new(api_key: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".into(),
            assistant_id: assistant_id.into(),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_owned();
        self
    }
}

// Wire shapes for the assistants-style API.

#[derive(Debug, Deserialize)]
struct CreatedObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    role: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    text: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

impl From<MessageObject> for ThreadMessage {
    fn from(message: MessageObject) -> Self {
        Self {
            role: message.role,
            segments: message
                .content
                .into_iter()
                .filter(|part| part.kind == "text")
                .filter_map(|part| part.text.map(|t| t.value))
                .collect(),
        }
    }
}

/// Production backend over the HTTP assistants API.
#[derive(Debug, Clone)]
pub struct HttpGenerationBackend {
    client: reqwest::Client,
    config: GenerationConfig,
}

impl HttpGenerationBackend {
    /// Build a backend sharing the pipeline's HTTP client settings.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the client cannot be constructed.
    pub fn new(search_config: &SearchConfig, config: GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(search_config)?,
            config,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("{what} request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SearchError::Http(format!("{what} HTTP error: {e}")))?;
        response
            .json()
            .await
            .map_err(|e| SearchError::Http(format!("{what} body unreadable: {e}")))
    }
}

impl GenerationBackend for HttpGenerationBackend {
    async fn create_thread(&self) -> Result<String> {
        let created: CreatedObject = Self::send_json(
            self.request(reqwest::Method::POST, "/threads")
                .json(&serde_json::json!({})),
            "create-thread",
        )
        .await?;
        Ok(created.id)
    }

    async fn append_message(&self, thread_id: &str, content: &str) -> Result<()> {
        let _: CreatedObject = Self::send_json(
            self.request(reqwest::Method::POST, &format!("/threads/{thread_id}/messages"))
                .json(&serde_json::json!({"role": "user", "content": content})),
            "create-message",
        )
        .await?;
        Ok(())
    }

    async fn start_run(&self, thread_id: &str) -> Result<String> {
        let run: RunObject = Self::send_json(
            self.request(reqwest::Method::POST, &format!("/threads/{thread_id}/runs"))
                .json(&serde_json::json!({"assistant_id": self.config.assistant_id})),
            "create-run",
        )
        .await?;
        Ok(run.id)
    }

    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<JobStatus> {
        let run: RunObject = Self::send_json(
            self.request(
                reqwest::Method::GET,
                &format!("/threads/{thread_id}/runs/{run_id}"),
            ),
            "get-run",
        )
        .await?;
        trace!(run = run.id, status = run.status, "run status polled");
        Ok(JobStatus::parse(&run.status))
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let list: MessageList = Self::send_json(
            self.request(
                reqwest::Method::GET,
                &format!("/threads/{thread_id}/messages"),
            ),
            "list-messages",
        )
        .await?;
        Ok(list.data.into_iter().map(ThreadMessage::from).collect())
    }
}

/// Drives a generation job from submission to a terminal state.
pub struct GenerationJobRunner<B: GenerationBackend> {
    backend: B,
    poll_interval: Duration,
    deadline: Duration,
}

impl<B: GenerationBackend> GenerationJobRunner<B> {
    /// Create a runner polling every `poll_interval` up to `deadline` per job.
    pub fn new(backend: B, poll_interval: Duration, deadline: Duration) -> Self {
        Self {
            backend,
            poll_interval,
            deadline,
        }
    }

    /// Submit `payload` as a new job: thread → message → run.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if any of the three backend calls fail.
    pub async fn submit(&self, payload: &serde_json::Value) -> Result<JobHandle> {
        let thread_id = self.backend.create_thread().await?;
        self.backend
            .append_message(&thread_id, &payload.to_string())
            .await?;
        let run_id = self.backend.start_run(&thread_id).await?;
        debug!(thread = thread_id, run = run_id, "generation job submitted");
        Ok(JobHandle { thread_id, run_id })
    }

    /// Poll until the job completes, then extract its output text.
    ///
    /// The deadline is wall-clock from the start of this call; once it
    /// elapses, no further polls are issued.
    ///
    /// # Errors
    ///
    /// - [`SearchError::GenerationTimeout`] when the deadline elapses first.
    /// - [`SearchError::Http`] when the run reaches a non-completed
    ///   terminal status.
    /// - [`SearchError::EmptyGenerationResult`] when the completed thread
    ///   holds no non-empty assistant text segment.
    pub async fn await_completion(&self, handle: &JobHandle) -> Result<String> {
        let started = Instant::now();

        loop {
            if started.elapsed() >= self.deadline {
                return Err(SearchError::GenerationTimeout(format!(
                    "run {} did not complete within {}s",
                    handle.run_id,
                    self.deadline.as_secs()
                )));
            }

            let status = self
                .backend
                .run_status(&handle.thread_id, &handle.run_id)
                .await?;
            match status {
                JobStatus::Completed => break,
                JobStatus::Failed => {
                    return Err(SearchError::Http(format!(
                        "generation run {} failed on the backend",
                        handle.run_id
                    )));
                }
                JobStatus::TimedOut => {
                    return Err(SearchError::GenerationTimeout(format!(
                        "run {} expired on the backend",
                        handle.run_id
                    )));
                }
                JobStatus::Queued | JobStatus::Running => {
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        let messages = self.backend.list_messages(&handle.thread_id).await?;
        for message in &messages {
            if message.role != "assistant" {
                continue;
            }
            if let Some(text) = message.segments.iter().find(|s| !s.trim().is_empty()) {
                return Ok(text.clone());
            }
        }
        Err(SearchError::EmptyGenerationResult(format!(
            "thread {} has no assistant text segment",
            handle.thread_id
        )))
    }

    /// Submit `payload`, await completion and parse the output as JSON.
    ///
    /// # Errors
    ///
    /// Everything from [`submit`](Self::submit) and
    /// [`await_completion`](Self::await_completion), plus
    /// [`SearchError::MalformedGenerationOutput`] when the output text is
    /// not valid JSON. Parse failures are terminal, never retried.
    pub async fn run_to_completion(&self, payload: &serde_json::Value) -> Result<serde_json::Value> {
        let handle = self.submit(payload).await?;
        let text = self.await_completion(&handle).await?;
        serde_json::from_str(&text).map_err(|e| {
            SearchError::MalformedGenerationOutput(format!(
                "run {} output is not valid JSON: {e}",
                handle.run_id
            ))
        })
    }
}
