use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a non-success response
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorDetails {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
}

impl ErrorDetails {
    pub fn into_message(self) -> String {
        self.message
            .filter(|message| !message.is_empty())
            .or(self.error_type)
            .unwrap_or_else(|| String::from("stream failed"))
    }
}

/// `GET /models` listing, used for pricing
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub pricing: Option<ModelPrices>,
}

/// USD per single token, as decimal strings
#[derive(Debug, Deserialize)]
pub struct ModelPrices {
    pub prompt: String,
    pub completion: String,
}
