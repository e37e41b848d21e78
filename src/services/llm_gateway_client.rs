use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::GenerationSettings;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Empty response from model {0}")]
    EmptyResponse(String),
}

/// One generation call.
///
/// `prompt` may contain `{name}` placeholders which are filled from
/// `template_vars` before the request is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: String,
    pub settings: GenerationSettings,
    pub template_vars: BTreeMap<String, String>,
}

impl GenerationRequest {
    pub fn new(
        prompt: impl Into<String>,
        system_prompt: impl Into<String>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: system_prompt.into(),
            settings,
            template_vars: BTreeMap::new(),
        }
    }

    pub fn with_vars(mut self, template_vars: BTreeMap<String, String>) -> Self {
        self.template_vars = template_vars;
        self
    }

    /// Prompt with every known placeholder substituted.
    pub fn rendered_prompt(&self) -> String {
        render_template(&self.prompt, &self.template_vars)
    }
}

/// Replaces `{name}` for every `name` in `vars`. Unknown placeholders and
/// stray braces are left as they are, so rendering cannot fail.
pub fn render_template(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Text generation capability shared by every component.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Returns the generated text, trimmed. Blank output is an error.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError>;
}

#[derive(Clone)]
pub struct LlmGatewayClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LlmGatewayClient {
    pub fn with_options(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let response = self
            .authorized(self.client.get(format!("{}/models", self.base_url)))
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(vec![]);
        }

        #[derive(Deserialize)]
        struct ModelsResponse {
            data: Vec<ModelInfo>,
        }

        #[derive(Deserialize)]
        struct ModelInfo {
            id: String,
        }

        let models: ModelsResponse = response.json().await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    pub async fn health_check(&self) -> Result<bool, GatewayError> {
        let response = self
            .authorized(self.client.get(format!("{}/models", self.base_url)))
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl LlmGateway for LlmGatewayClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        let body = ChatCompletionRequest {
            model: request.settings.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.rendered_prompt(),
                },
            ],
            temperature: request.settings.temperature,
            max_tokens: request.settings.max_output_tokens,
        };

        let response = self
            .authorized(
                self.client
                    .post(format!("{}/chat/completions", self.base_url))
                    .json(&body),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::InvalidResponse("no choices returned".to_string()))?;

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::EmptyResponse(request.settings.model));
        }

        tracing::debug!(
            "Generated {} chars with {}",
            trimmed.len(),
            request.settings.model
        );
        Ok(trimmed.to_string())
    }
}

// Request/Response Models
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
