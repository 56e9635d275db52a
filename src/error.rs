//! Error taxonomy
//!
//! Every concern gets its own enum; `AppError` wraps them for the cycle level.
//! Only `StoreError` is allowed to abort a whole cycle, everything else is
//! contained at query or candidate granularity.

use std::time::Duration;

use thiserror::Error;

use crate::services::navigator::NavState;

/// Browser / CDP level failures
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Launching the headless browser failed
    #[error("failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Attaching to a running browser failed
    #[error("failed to connect to browser at {url}: {source}")]
    ConnectionFailed {
        url: String,
        #[source]
        source: chromiumoxide::error::CdpError,
    },

    /// Any CDP command failure
    #[error("CDP command failed: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    /// A page operation exceeded its bound
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The browser process or its event loop went away
    #[error("browser session is disconnected")]
    Disconnected,

    /// A script result did not have the expected shape
    #[error("unexpected script result: {0}")]
    ScriptResult(#[from] serde_json::Error),

    /// Writing a debug artefact failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the search → local-results state machine
#[derive(Debug, Error)]
pub enum NavigationError {
    /// The home surface stayed unreachable after every attempt of the retry policy
    #[error("search home unreachable after {attempts} attempts: {source}")]
    HomeUnreachable {
        attempts: u32,
        #[source]
        source: BrowserError,
    },

    /// The configured local-results endpoint is not a URL
    #[error("invalid local results url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// An irrecoverable step after all fallbacks were spent
    #[error("extraction aborted in state {state:?}: {source}")]
    ExtractionAborted {
        state: NavState,
        #[source]
        source: BrowserError,
    },
}

/// Persistence layer failures. Fatal for the cycle.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row that was just written could not be read back
    #[error("{entity} vanished after write")]
    Vanished { entity: &'static str },

    #[error("failed to prepare database location {path}: {source}")]
    Location {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// External enrichment service failures, recovered with fallback values
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("LLM API call failed (model: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: async_openai::error::OpenAIError,
    },

    #[error("LLM returned empty content (model: {model})")]
    EmptyContent { model: String },

    #[error("no JSON object found in LLM reply: {reply}")]
    NoJson { reply: String },

    #[error("LLM reply is not valid enrichment JSON: {0}")]
    BadJson(#[from] serde_json::Error),

    #[error("enrichment timed out after {0:?}")]
    Timeout(Duration),
}

/// Dispatch failures. The lead stays undispatched and is retried next cycle.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("webhook request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("webhook rejected the lead with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("dispatch timed out after {0:?}")]
    Timeout(Duration),
}

/// Configuration loading / validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {var_name} has value '{value}' which is not a valid {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("worker task failed: {0}")]
    Worker(String),
}

// ========== convenience constructors ==========

impl BrowserError {
    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        BrowserError::Timeout { operation, after }
    }
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

/// Application result alias
pub type AppResult<T> = Result<T, AppError>;

/// Store result alias
pub type StoreResult<T> = Result<T, StoreError>;
