//! The adapter interface: a single capability, `send_turn`, that translates
//! canonical messages and tool definitions to and from a specific provider's
//! wire format.

mod anthropic;
mod openai;
mod test_adapter;

pub use anthropic::AnthropicAdapter;
pub use openai::OpenAiAdapter;
pub use test_adapter::TestAdapter;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::message::{Message, ToolCall, ToolDefinition};

/// Errors an [`Adapter`] can raise. The retry wrapper classifies
/// [`AdapterError::Timeout`], [`AdapterError::Connection`], and
/// [`AdapterError::Http`] with a status in `{429, 500, 502, 503}` as
/// transient; everything else propagates immediately.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    #[error("openai client error: {0}")]
    OpenAi(#[from] async_openai::error::OpenAIError),

    #[error("network request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),

    #[error("adapter error: {0}")]
    Other(String),
}

impl AdapterError {
    /// The transient classification the retry wrapper relies on.
    pub fn is_transient(&self) -> bool {
        match self {
            AdapterError::Timeout | AdapterError::Connection(_) => true,
            AdapterError::Http { status, .. } => matches!(status, 429 | 500 | 502 | 503),
            _ => false,
        }
    }

    /// A short, stable name for the transient-error-type list the retry
    /// wrapper and `TrialResult` carry.
    pub fn transient_type_name(&self) -> &'static str {
        match self {
            AdapterError::Timeout => "timeout",
            AdapterError::Connection(_) => "connection",
            AdapterError::Http { .. } => "http",
            _ => "other",
        }
    }
}

/// Per-call configuration passed through to the adapter.
#[derive(Debug, Clone, Default)]
pub struct AdapterConfig {
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub seed: Option<i64>,
    /// Pass-through, safety-gated map merged as top-level request
    /// parameters. Validated by [`crate::execution::extras::validate_extras`]
    /// before it ever reaches an adapter.
    pub extras: Map<String, Value>,
}

/// One tool call's outcome as returned by the provider — used while
/// converting a raw provider response back into canonical [`ToolCall`]s.
#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// What one `send_turn` call produced.
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub raw_response: Value,
    pub finish_reason: String,
}

/// A thin component translating canonical messages/tools to and from a
/// specific LLM provider's wire format. Client handles are lazily created on
/// first call; construction does no network I/O.
#[async_trait]
pub trait Adapter: Send + Sync {
    async fn send_turn(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        config: &AdapterConfig,
    ) -> Result<TurnResult, AdapterError>;

    /// Defaults to the adapter's registered short name; providers with a
    /// distinct wire identity (e.g. a fully-qualified custom adapter) may
    /// override it.
    fn provider_name(&self) -> &str;
}

/// A zero-argument factory producing a fresh [`Adapter`] instance. The Trial
/// Runner calls this once per trial so no adapter instance (and no SDK
/// connection pool) is shared across trials.
pub type AdapterFactory = Box<dyn Fn() -> Box<dyn Adapter> + Send + Sync>;

/// Resolves a short adapter name (`openai`, `anthropic`) to a boxed
/// [`Adapter`]. Mirrors `adapters/registry.py`'s `BUILTIN_ADAPTERS` table;
/// unlike the Python original there is no dotted-path dynamic import, since
/// Rust has no runtime module loading — callers needing a custom adapter
/// construct it directly and hand the Trial Runner an [`AdapterFactory`].
pub fn get_builtin_adapter(name: &str) -> Result<Box<dyn Adapter>, AdapterError> {
    match name {
        "openai" => Ok(Box::new(OpenAiAdapter::new())),
        "anthropic" => Ok(Box::new(AnthropicAdapter::new())),
        other => Err(AdapterError::UnknownAdapter(other.to_string())),
    }
}
