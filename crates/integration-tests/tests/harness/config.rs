//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::time::Duration;

use parley_config::{
    ChatConfig, ChatProviderKind, Config, CorsConfig, FunctionsConfig, HealthConfig, HistoryConfig, OpenAiConfig,
    OpenAiFlavor, ServerConfig, SessionMode, WebhookConfig,
};
use secrecy::SecretString;
use url::Url;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig {
                        enabled: true,
                        ..HealthConfig::default()
                    },
                    ..ServerConfig::default()
                },
                chat: ChatConfig::default(),
                ..Config::default()
            },
        }
    }

    /// Answer with an OpenAI-compatible backend at `base_url`
    pub fn with_openai(mut self, base_url: &str) -> Self {
        self.config.chat.provider = ChatProviderKind::Openai;
        self.config.chat.openai = Some(OpenAiConfig {
            flavor: OpenAiFlavor::Openai,
            base_url: Url::parse(base_url).expect("valid URL"),
            api_key: Some(SecretString::from("test-key")),
            api_version: None,
            model: "mock-model".to_owned(),
            system_message: "You are a test assistant.".to_owned(),
            temperature: Some(0.0),
            max_tokens: Some(256),
            top_p: None,
            stop: Vec::new(),
            timeout: Duration::from_secs(5),
            user_security_context: false,
            application_name: "Parley".to_owned(),
            data_source: None,
        });
        self
    }

    /// Answer with a workflow webhook at `url`
    pub fn with_webhook(mut self, url: &str) -> Self {
        self.config.chat.provider = ChatProviderKind::Webhook;
        self.config.chat.webhook = Some(WebhookConfig {
            url: Url::parse(url).expect("valid URL"),
            bearer_token: SecretString::from("hook-token"),
            timeout: Duration::from_secs(5),
            sessions: SessionMode::Memory,
        });
        self
    }

    /// Enable function calling against a host at `base_url`
    pub fn with_functions(mut self, base_url: &str) -> Self {
        self.config.chat.functions = FunctionsConfig {
            enabled: true,
            tools_url: Some(Url::parse(&format!("{base_url}/api/tools")).expect("valid URL")),
            tools_key: Some(SecretString::from("tools-key")),
            tool_url: Some(Url::parse(&format!("{base_url}/api/tool")).expect("valid URL")),
            tool_key: Some(SecretString::from("tool-key")),
            timeout: Duration::from_secs(5),
        };
        self
    }

    /// Respond with one JSON object instead of a stream
    pub fn without_streaming(mut self) -> Self {
        self.config.chat.stream = false;
        self
    }

    /// Enable the in-memory conversation history
    pub fn with_history(mut self) -> Self {
        self.config.history = HistoryConfig {
            enabled: true,
            ..HistoryConfig::default()
        };
        self
    }

    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    pub fn build(self) -> Config {
        self.config.validate().expect("test configuration is valid");
        self.config
    }
}
