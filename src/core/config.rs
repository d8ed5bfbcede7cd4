use crate::core::pricing::{ModelPricing, PricingTable};
use crate::core::LLMError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

include!(concat!(env!("OUT_DIR"), "/config_embedded.rs"));

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `HTTP-Referer` to identify the calling application
    pub referer: String,
    /// Sent as `X-Title`
    pub title: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub model: String,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub enable_tools: bool,
    #[serde(default)]
    pub tools: Vec<String>,
    pub max_steps: u32,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub pricing: HashMap<String, ModelPricing>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("Invalid default config")
    }
}

impl Config {
    /// Loads `config.toml` from the working directory, falling back to the embedded default
    pub fn load() -> Result<Self, LLMError> {
        let config_path = Path::new("config.toml");
        if config_path.exists() {
            Self::load_from(config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, LLMError> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| LLMError::ConfigError(format!("Failed to read config file: {e}")))?;

        toml::from_str(&contents)
            .map_err(|e| LLMError::ConfigError(format!("Failed to parse config file: {e}")))
    }

    pub fn update_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn get_model(&self) -> &str {
        &self.model
    }

    pub fn pricing_table(&self) -> PricingTable {
        self.pricing.clone()
    }
}
