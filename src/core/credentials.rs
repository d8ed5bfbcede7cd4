/// Synchronous source for the current gateway API key
pub trait ApiKeyProvider: Send + Sync {
    fn api_key(&self) -> Option<String>;

    /// Name shown to the user when no key is available
    fn source_name(&self) -> &str {
        "API key"
    }
}

/// Reads the key from `.env` first, then the process environment
#[derive(Debug, Clone)]
pub struct EnvApiKey {
    var: String,
}

impl EnvApiKey {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl ApiKeyProvider for EnvApiKey {
    fn api_key(&self) -> Option<String> {
        dotenv::var(&self.var)
            .or_else(|_| std::env::var(&self.var))
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    fn source_name(&self) -> &str {
        &self.var
    }
}

impl ApiKeyProvider for String {
    fn api_key(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.clone())
    }
}

impl ApiKeyProvider for Option<String> {
    fn api_key(&self) -> Option<String> {
        self.as_ref().and_then(ApiKeyProvider::api_key)
    }
}
