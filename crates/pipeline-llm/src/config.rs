//! Resolved gateway credentials.
//!
//! The core does not care where the `{api_key, project_id, base_url}`
//! triple came from; this loader reads an optional `config.toml` and lets
//! environment variables override it.

use serde::{Deserialize, Serialize};

const CONFIG_FILE_PATH: &str = "config.toml";
const DEFAULT_API_URL: &str = "https://us.posthog.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub api_base_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::load()
    }
}

impl GatewayConfig {
    pub fn load() -> Self {
        let mut config = Self::empty();

        if std::path::Path::new(CONFIG_FILE_PATH).exists() {
            if let Ok(content) = std::fs::read_to_string(CONFIG_FILE_PATH) {
                if let Ok(file_config) = toml::from_str::<GatewayConfig>(&content) {
                    config = file_config;
                }
            }
        }

        if let Ok(api_key) = std::env::var("POSTHOG_API_KEY") {
            config.api_key = Some(api_key);
        }
        if let Ok(project_id) = std::env::var("POSTHOG_PROJECT_ID") {
            config.project_id = Some(project_id);
        }
        if let Ok(api_url) = std::env::var("POSTHOG_API_URL") {
            config.api_base_url = api_url;
        }

        config
    }

    pub fn empty() -> Self {
        Self {
            api_key: None,
            project_id: None,
            api_base_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.project_id.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// LLM-gateway base URL for the configured project, or `None` when the
    /// credential triple is incomplete.
    pub fn gateway_url(&self) -> Option<String> {
        if !self.is_configured() {
            return None;
        }
        let project = self.project_id.as_deref()?;
        Some(format!(
            "{}/api/projects/{}/llm_gateway",
            self.api_base_url.trim_end_matches('/'),
            project
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_url_requires_full_triple() {
        let mut config = GatewayConfig::empty();
        assert!(config.gateway_url().is_none());

        config.api_key = Some("phx_key".to_string());
        assert!(config.gateway_url().is_none());

        config.project_id = Some("1234".to_string());
        assert_eq!(
            config.gateway_url().as_deref(),
            Some("https://us.posthog.com/api/projects/1234/llm_gateway")
        );
    }

    #[test]
    fn trailing_slash_in_base_url_is_tolerated() {
        let config = GatewayConfig {
            api_key: Some("k".to_string()),
            project_id: Some("7".to_string()),
            api_base_url: "https://eu.posthog.com/".to_string(),
        };
        assert_eq!(
            config.gateway_url().as_deref(),
            Some("https://eu.posthog.com/api/projects/7/llm_gateway")
        );
    }
}
