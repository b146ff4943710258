//! Client for the OpenAI-compatible chat completion gateway.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::types::{ChatMessage, Role};
use crate::config::{Config, GatewayConfig};

use super::prompt::{build_system_prompt, ChatSettings};

/// Reply used when the gateway answers without any content.
pub const EMPTY_REPLY: &str =
  "I apologize, but I could not generate a response. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
  #[error("Rate limit exceeded. Please try again later.")]
  RateLimited,
  #[error("AI credits exhausted. Please add credits to continue.")]
  CreditsExhausted,
  #[error("gateway returned {status}: {body}")]
  Status { status: StatusCode, body: String },
  #[error("gateway request failed: {0}")]
  Transport(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage>,
  temperature: f32,
  max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

/// Large-language-model gateway client.
#[derive(Clone)]
pub struct GatewayClient {
  http: reqwest::Client,
  config: GatewayConfig,
  api_key: String,
}

impl GatewayClient {
  pub fn new(config: &Config) -> color_eyre::Result<Self> {
    Ok(Self {
      http: reqwest::Client::new(),
      config: config.gateway.clone(),
      api_key: Config::get_gateway_key()?,
    })
  }

  /// Ask for the assistant's next turn given the conversation so far.
  pub async fn complete(
    &self,
    history: &[ChatMessage],
    settings: &ChatSettings,
  ) -> Result<String, GatewayError> {
    let request = build_request(&self.config, history, settings);
    debug!(model = %self.config.model, turns = history.len(), "requesting completion");

    let response = self
      .http
      .post(&self.config.url)
      .bearer_auth(&self.api_key)
      .json(&request)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!(%status, %body, "gateway error");
      return Err(match status {
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited,
        StatusCode::PAYMENT_REQUIRED => GatewayError::CreditsExhausted,
        _ => GatewayError::Status { status, body },
      });
    }

    let body: CompletionResponse = response.json().await?;
    Ok(reply_text(body))
  }
}

fn build_request<'a>(
  config: &'a GatewayConfig,
  history: &[ChatMessage],
  settings: &ChatSettings,
) -> CompletionRequest<'a> {
  let mut messages = Vec::with_capacity(history.len() + 1);
  messages.push(ChatMessage {
    role: Role::System,
    content: build_system_prompt(settings),
  });
  messages.extend(history.iter().cloned());

  CompletionRequest {
    model: &config.model,
    messages,
    temperature: config.temperature,
    max_tokens: config.max_tokens,
  }
}

fn reply_text(response: CompletionResponse) -> String {
  response
    .choices
    .into_iter()
    .next()
    .and_then(|choice| choice.message)
    .and_then(|message| message.content)
    .filter(|content| !content.is_empty())
    .unwrap_or_else(|| EMPTY_REPLY.to_string())
}
