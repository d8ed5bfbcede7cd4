use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;

use super::accumulator::StreamAccumulator;
use super::decoder::decode_stream;
use super::types::{
    ChatCompletionObject, ChatCompletionRequest, ErrorResponse, ModelsResponse, Tool,
    UsageOptions,
};
use crate::core::credentials::{ApiKeyProvider, EnvApiKey};
use crate::core::pricing::{ModelPricing, PricingCache, PricingSource, PricingTable};
use crate::core::{Config, LLMError};
use crate::eventsource::{EventSourceExt, LineStream};
use crate::providers::llm::{Completion, LLMClient, StreamHandler};
use crate::providers::{FinishReason, Message, StreamEvent, StreamOutcome};
use crate::tools::ToolDefinition;

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";
const MODELS_PATH: &str = "models";
const REFERER_HEADER: &str = "HTTP-Referer";
const TITLE_HEADER: &str = "X-Title";
const TOKENS_PER_UNIT: f64 = 1_000_000.0;

/// Client for an OpenAI-compatible chat-completion gateway
pub struct OpenRouterClient {
    api_key: Box<dyn ApiKeyProvider>,
    client: Client,
    config: Config,
    pricing: Arc<PricingCache>,
}

impl OpenRouterClient {
    /// Creates a client whose pricing cache is seeded from `config`
    ///
    /// # Arguments
    /// * `config` - Model, gateway and pricing settings
    /// * `api_key` - Where the bearer credential is read from on every request
    pub fn new(config: Config, api_key: impl ApiKeyProvider + 'static) -> Self {
        let pricing = Arc::new(PricingCache::new(config.pricing_table()));
        Self {
            api_key: Box::new(api_key),
            client: Client::new(),
            config,
            pricing,
        }
    }

    /// Creates a client reading its key from the environment variable named in `config`
    pub fn from_config(config: Config) -> Self {
        let api_key = EnvApiKey::new(config.gateway.api_key_env.clone());
        Self::new(config, api_key)
    }

    pub const fn pricing(&self) -> &Arc<PricingCache> {
        &self.pricing
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.gateway.base_url.trim_end_matches('/'))
    }

    fn current_api_key(&self) -> Result<String, LLMError> {
        self.api_key
            .api_key()
            .ok_or_else(|| LLMError::MissingApiKey(self.api_key.source_name().to_string()))
    }

    fn build_headers(&self, api_key: &str) -> Result<HeaderMap, LLMError> {
        let invalid =
            |e: InvalidHeaderValue| LLMError::ConfigError(format!("Invalid header value: {e}"));

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(invalid)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            REFERER_HEADER,
            HeaderValue::from_str(&self.config.gateway.referer).map_err(invalid)?,
        );
        headers.insert(
            TITLE_HEADER,
            HeaderValue::from_str(&self.config.gateway.title).map_err(invalid)?,
        );
        Ok(headers)
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [Message],
        tools: Option<&'a [ToolDefinition]>,
        stream: bool,
    ) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: self.config.get_model(),
            messages,
            tools: tools
                .filter(|tools| !tools.is_empty())
                .map(|tools| tools.iter().map(Tool::from).collect()),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream,
            usage: stream.then_some(UsageOptions { include: true }),
            ..Default::default()
        }
    }

    /// Sends a chat completion request to the gateway
    ///
    /// # Returns
    /// The successful response, or an error carrying the gateway's message
    pub async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest<'_>,
    ) -> Result<Response, LLMError> {
        let api_key = self.current_api_key()?;
        let headers = self.build_headers(&api_key)?;

        let response = self
            .client
            .post(self.endpoint(CHAT_COMPLETIONS_PATH))
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(LLMError::from)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(response).await)
        }
    }

    /// Streams one turn into `handler`.
    ///
    /// Precondition and transport failures are passed to `handler.on_error`
    /// before being returned. Cancellation returns `StreamOutcome::Cancelled`
    /// without touching the error callback.
    pub async fn stream_chat(
        &self,
        request: &ChatCompletionRequest<'_>,
        handler: &mut dyn StreamHandler,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, LLMError> {
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("[Client] cancelled before the response arrived");
                return Ok(StreamOutcome::Cancelled);
            }
            response = self.create_chat_completion(request) => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                handler.on_error(&e);
                return Err(e);
            }
        };

        drive_stream(response.lines(), request.model, &self.pricing, handler, cancel).await
    }
}

/// Reads a line stream to the end, feeding the accumulator and the handler
pub async fn drive_stream(
    lines: LineStream,
    model: &str,
    pricing: &PricingCache,
    handler: &mut dyn StreamHandler,
    cancel: &CancellationToken,
) -> Result<StreamOutcome, LLMError> {
    let mut chunks = decode_stream(lines);
    let mut accumulator = StreamAccumulator::new();

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("[Client] stream cancelled");
                accumulator.cancel();
                return Ok(StreamOutcome::Cancelled);
            }
            next = chunks.next() => next,
        };

        let Some(chunk) = next else {
            break;
        };

        let mut chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                accumulator.fail();
                handler.on_error(&e);
                return Err(e);
            }
        };

        if let Some(message) = chunk.error.take() {
            accumulator.fail();
            let e = LLMError::StreamError(message);
            handler.on_error(&e);
            return Err(e);
        }

        for event in accumulator.apply(chunk) {
            emit(event, model, pricing, handler);
        }
    }

    Ok(accumulator.finish())
}

fn emit(event: StreamEvent, model: &str, pricing: &PricingCache, handler: &mut dyn StreamHandler) {
    match event {
        StreamEvent::Content(text) => handler.on_content(&text),
        StreamEvent::Reasoning(text) => handler.on_reasoning(&text),
        StreamEvent::Usage(usage) => handler.on_complete(&usage, pricing.cost(model, &usage)),
        StreamEvent::ToolCalls {
            calls,
            finish_reason,
            reasoning_details,
        } => handler.on_tool_calls(&calls, &finish_reason, reasoning_details.as_deref()),
    }
}

async fn api_error(response: Response) -> LLMError {
    let status = response.status();
    let message = response
        .json::<ErrorResponse>()
        .await
        .ok()
        .and_then(|body| body.error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("request failed: {status}"));

    LLMError::Api {
        status: status.as_u16(),
        message,
    }
}

fn per_million(price: &str) -> Option<f64> {
    price
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price >= 0.0)
        .map(|price| price * TOKENS_PER_UNIT)
}

#[async_trait]
impl LLMClient for OpenRouterClient {
    async fn query(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<Completion, LLMError> {
        let request = self.build_request(messages, tools, false);
        let response = self.create_chat_completion(&request).await?;
        let response_text = response
            .text()
            .await
            .map_err(|e| LLMError::ResponseFormat(format!("Failed to get response text: {e}")))?;
        let object: ChatCompletionObject = serde_json::from_str(&response_text)
            .map_err(|e| LLMError::ResponseFormat(format!("Failed to parse response: {e}")))?;

        let choice = object
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::ResponseFormat(String::from("Response has no choices")))?;
        let cost = object
            .usage
            .map(|usage| self.pricing.cost(request.model, &usage))
            .unwrap_or_default();

        let message = choice.message;
        Ok(Completion {
            message: Message::assistant(
                message.content.unwrap_or_default(),
                message.tool_calls.filter(|calls| !calls.is_empty()),
                message.reasoning_details.filter(|details| !details.is_empty()),
            ),
            reasoning: message.reasoning,
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from),
            usage: object.usage,
            cost,
        })
    }

    async fn query_streaming(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        handler: &mut dyn StreamHandler,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, LLMError> {
        let request = self.build_request(messages, tools, true);
        self.stream_chat(&request, handler, cancel).await
    }
}

#[async_trait]
impl PricingSource for OpenRouterClient {
    async fn fetch_pricing(&self) -> Result<PricingTable, LLMError> {
        let mut request = self.client.get(self.endpoint(MODELS_PATH));
        if let Ok(api_key) = self.current_api_key() {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(LLMError::from)?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ResponseFormat(format!("Failed to parse model list: {e}")))?;

        let table = models
            .data
            .into_iter()
            .filter_map(|model| {
                let prices = model.pricing?;
                match (per_million(&prices.prompt), per_million(&prices.completion)) {
                    (Some(input), Some(output)) => Some((model.id, ModelPricing { input, output })),
                    _ => {
                        warn!("[Pricing] unusable prices for '{}'", model.id);
                        None
                    }
                }
            })
            .collect();

        Ok(table)
    }
}
