//! Remote function registry and invoker

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_config::FunctionsConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

use crate::error::{ChatError, FunctionError};
use crate::types::ToolDefinition;

/// Executes one named function call
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Run `name` with JSON-encoded `arguments`, returning the textual result
    async fn invoke(&self, name: &str, arguments: &str) -> Result<String, FunctionError>;
}

/// Functions published by the function host, fetched once at startup
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    tools: Vec<ToolDefinition>,
    names: HashSet<String>,
}

impl FunctionRegistry {
    /// Registry over the given tools
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        let names = tools.iter().map(|tool| tool.function.name.clone()).collect();
        Self { tools, names }
    }

    /// Fetch the tool list from the function host
    ///
    /// Any failure leaves the registry empty, disabling function calling for
    /// the lifetime of the process.
    pub async fn fetch(client: &Client, config: &FunctionsConfig) -> Self {
        let (Some(url), Some(key)) = (&config.tools_url, &config.tools_key) else {
            return Self::default();
        };

        match Self::try_fetch(client, url, key, config.timeout).await {
            Ok(registry) => {
                tracing::info!(count = registry.tools.len(), "loaded remote functions");
                registry
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "failed to load remote functions, function calling disabled");
                Self::default()
            }
        }
    }

    async fn try_fetch(client: &Client, url: &Url, key: &SecretString, timeout: Duration) -> Result<Self, ChatError> {
        let response = client
            .get(url.clone())
            .query(&[("code", key.expose_secret())])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ChatError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::upstream(Some(status.as_u16()), format!("tools endpoint returned {status}")));
        }

        let tools: Vec<ToolDefinition> = response
            .json()
            .await
            .map_err(|e| ChatError::upstream(None, format!("failed to parse tools: {e}")))?;

        Ok(Self::new(tools))
    }

    /// Published tool definitions
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Whether `name` is a published function
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Whether no function is available
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[derive(Serialize)]
struct InvocationRequest<'a> {
    tool_name: &'a str,
    tool_arguments: serde_json::Value,
}

/// Invokes functions on the remote function host
pub struct RemoteFunctionInvoker {
    client: Client,
    tool_url: Url,
    tool_key: SecretString,
    timeout: Duration,
    registry: Arc<FunctionRegistry>,
}

impl RemoteFunctionInvoker {
    /// Create from the functions configuration
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Configuration` if the tool endpoint or key is missing.
    pub fn new(client: Client, config: &FunctionsConfig, registry: Arc<FunctionRegistry>) -> Result<Self, ChatError> {
        let (Some(tool_url), Some(tool_key)) = (config.tool_url.clone(), config.tool_key.clone()) else {
            return Err(ChatError::Configuration(
                "chat.functions.tool_url and tool_key are required".to_owned(),
            ));
        };

        Ok(Self {
            client,
            tool_url,
            tool_key,
            timeout: config.timeout,
            registry,
        })
    }
}

#[async_trait]
impl FunctionInvoker for RemoteFunctionInvoker {
    async fn invoke(&self, name: &str, arguments: &str) -> Result<String, FunctionError> {
        if !self.registry.contains(name) {
            return Err(FunctionError::Unknown(name.to_owned()));
        }

        let failed = |message: String| FunctionError::Failed {
            name: name.to_owned(),
            message,
        };

        let body = InvocationRequest {
            tool_name: name,
            tool_arguments: serde_json::from_str(arguments)
                .unwrap_or_else(|_| serde_json::Value::String(arguments.to_owned())),
        };

        tracing::debug!(function = %name, "invoking remote function");

        let response = self
            .client
            .post(self.tool_url.clone())
            .query(&[("code", self.tool_key.expose_secret())])
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(function = %name, error = %e, "function request failed");
                failed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(function = %name, status = %status, "function host returned error");
            return Err(failed(format!("function host returned {status}")));
        }

        response.text().await.map_err(|e| failed(e.to_string()))
    }
}
