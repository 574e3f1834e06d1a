use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::deserialize_duration;

/// Chat provider selection and per-provider settings
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Which backend answers conversation turns
    #[serde(default)]
    pub provider: ChatProviderKind,
    /// Stream responses as newline-delimited JSON
    #[serde(default = "default_stream")]
    pub stream: bool,
    /// Hosted LLM API settings
    #[serde(default)]
    pub openai: Option<OpenAiConfig>,
    /// Workflow webhook settings
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
    /// Remote function calling
    #[serde(default)]
    pub functions: FunctionsConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: ChatProviderKind::default(),
            stream: default_stream(),
            openai: None,
            webhook: None,
            functions: FunctionsConfig::default(),
        }
    }
}

/// Supported chat backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatProviderKind {
    /// OpenAI-compatible chat completions API
    #[default]
    Openai,
    /// Workflow-automation webhook (e.g. n8n)
    Webhook,
}

/// Hosted LLM API configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// Endpoint and authentication dialect
    #[serde(default)]
    pub flavor: OpenAiFlavor,
    /// Base URL of the API (Azure: the resource endpoint)
    pub base_url: Url,
    /// API key
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// `api-version` query parameter, required for Azure
    #[serde(default)]
    pub api_version: Option<String>,
    /// Model (Azure: deployment name)
    pub model: String,
    /// System prompt prepended to every conversation
    #[serde(default = "default_system_message")]
    pub system_message: String,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Nucleus sampling threshold
    #[serde(default)]
    pub top_p: Option<f64>,
    /// Stop sequences
    #[serde(default)]
    pub stop: Vec<String>,
    /// Bound on each upstream exchange (stream establishment included)
    #[serde(default = "default_openai_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    /// Attach end-user security context to the request
    #[serde(default)]
    pub user_security_context: bool,
    /// Application name reported in the user security context
    #[serde(default = "default_application_name")]
    pub application_name: String,
    /// Retrieval data source forwarded verbatim in `extra_body.data_sources`
    #[serde(default)]
    pub data_source: Option<serde_json::Value>,
}

/// Endpoint layout and auth header style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenAiFlavor {
    /// `{base}/chat/completions` with bearer auth
    #[default]
    Openai,
    /// `{base}/openai/deployments/{model}/chat/completions?api-version=..` with `api-key` header
    Azure,
}

/// Remote function calling configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionsConfig {
    /// Enable tool calls against the remote function host
    #[serde(default)]
    pub enabled: bool,
    /// Endpoint listing available tools
    #[serde(default)]
    pub tools_url: Option<Url>,
    /// Access key for the tools listing
    #[serde(default)]
    pub tools_key: Option<SecretString>,
    /// Endpoint executing one tool
    #[serde(default)]
    pub tool_url: Option<Url>,
    /// Access key for tool execution
    #[serde(default)]
    pub tool_key: Option<SecretString>,
    /// Bound on each function host exchange
    #[serde(default = "default_functions_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tools_url: None,
            tools_key: None,
            tool_url: None,
            tool_key: None,
            timeout: default_functions_timeout(),
        }
    }
}

/// Workflow webhook configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Full webhook URL
    pub url: Url,
    /// Bearer token sent in the `Authorization` header
    pub bearer_token: SecretString,
    /// Bound on each webhook call
    #[serde(default = "default_webhook_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    /// How session identifiers are assigned
    #[serde(default)]
    pub sessions: SessionMode,
}

/// Session identifier assignment for the webhook provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Per user and conversation, minted and remembered in process memory
    #[default]
    Memory,
    /// The conversation identifier itself
    Conversation,
}

const fn default_stream() -> bool {
    true
}

fn default_system_message() -> String {
    "You are an AI assistant that helps people find information.".to_owned()
}

fn default_application_name() -> String {
    "Parley".to_owned()
}

const fn default_openai_timeout() -> Duration {
    Duration::from_secs(60)
}

const fn default_functions_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_webhook_timeout() -> Duration {
    Duration::from_secs(120)
}
