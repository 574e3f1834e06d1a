use std::path::Path;

use secrecy::ExposeSecret;

use crate::{AllowList, ChatProviderKind, Config, OpenAiFlavor};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, deserializes and validates.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// expanded, the TOML is malformed, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded = crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        tracing::debug!(provider = ?config.chat.provider, stream = config.chat.stream, "configuration loaded");

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if the selected provider lacks its section or
    /// function calling is enabled without its endpoints
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_provider()?;
        self.validate_functions()?;
        self.validate_cors()?;
        Ok(())
    }

    fn validate_provider(&self) -> anyhow::Result<()> {
        match self.chat.provider {
            ChatProviderKind::Openai => {
                let Some(ref openai) = self.chat.openai else {
                    anyhow::bail!("chat.provider = \"openai\" requires a [chat.openai] section");
                };

                if openai.model.trim().is_empty() {
                    anyhow::bail!("chat.openai.model must not be empty");
                }

                if openai.flavor == OpenAiFlavor::Azure && openai.api_version.as_deref().is_none_or(str::is_empty) {
                    anyhow::bail!("chat.openai.api_version is required when flavor = \"azure\"");
                }
            }
            ChatProviderKind::Webhook => {
                let Some(ref webhook) = self.chat.webhook else {
                    anyhow::bail!("chat.provider = \"webhook\" requires a [chat.webhook] section");
                };

                if webhook.bearer_token.expose_secret().is_empty() {
                    anyhow::bail!("chat.webhook.bearer_token must not be empty");
                }
            }
        }

        Ok(())
    }

    fn validate_functions(&self) -> anyhow::Result<()> {
        let functions = &self.chat.functions;

        if !functions.enabled {
            return Ok(());
        }

        if functions.tools_url.is_none() || functions.tool_url.is_none() {
            anyhow::bail!("chat.functions requires tools_url and tool_url when enabled");
        }

        if functions.tools_key.is_none() || functions.tool_key.is_none() {
            anyhow::bail!("chat.functions requires tools_key and tool_key when enabled");
        }

        Ok(())
    }

    fn validate_cors(&self) -> anyhow::Result<()> {
        if let Some(ref cors) = self.server.cors
            && cors.credentials
            && cors.origins == AllowList::Any
        {
            anyhow::bail!("server.cors.credentials requires an explicit origins list");
        }

        Ok(())
    }
}
