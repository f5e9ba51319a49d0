use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{
    ClientSettings, GenerationRequest, GenerationResponse, HttpRequest, ProviderKind,
    ProviderProfile, Transport, estimate_tokens, parse_error, response_id, send,
};
use crate::core::error::UpstreamError;

pub(crate) static PROFILE: ProviderProfile = ProviderProfile {
    display_name: "OpenAI",
    default_model: "gpt-3.5-turbo",
    default_base_url: "https://api.openai.com/v1",
    max_tokens: 4096,
    temperature: (0.0, 2.0),
    supported_models: &["gpt-4", "gpt-4-turbo", "gpt-3.5-turbo", "gpt-3.5-turbo-16k"],
    strengths: &[
        "Excellent general knowledge",
        "Strong reasoning capabilities",
        "Good code generation",
        "Wide range of models",
        "Reliable API",
    ],
    weaknesses: &[
        "Can be expensive for high usage",
        "Knowledge cutoff limitations",
        "Rate limiting on free tier",
    ],
    best_for: &[
        "General text generation",
        "Code completion and debugging",
        "Creative writing",
        "Question answering",
    ],
    pricing: "Pay per token (~$0.002/1K tokens for GPT-3.5)",
};

/// Chat-completions client (OpenAI and compatible endpoints).
#[derive(Clone)]
pub struct OpenAiClient {
    pub(super) settings: ClientSettings,
    transport: Arc<dyn Transport>,
}

impl OpenAiClient {
    pub fn new(settings: ClientSettings, transport: Arc<dyn Transport>) -> Self {
        Self {
            settings,
            transport,
        }
    }

    pub fn is_available(&self) -> bool {
        self.settings.live
    }

    pub async fn generate(
        &self,
        cancel: &CancellationToken,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        let started = Instant::now();
        let model = self.settings.resolve_model(request.model.as_deref());

        let body = serde_json::to_value(build_request(model, request))
            .map_err(|e| UpstreamError::Encode(e.to_string()))?;
        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );
        let http = HttpRequest::post(url, body)
            .header("Authorization", format!("Bearer {}", self.settings.api_key));

        let reply = send(self.transport.as_ref(), cancel, http).await?;
        let api_response: ApiResponse =
            serde_json::from_str(&reply.body).map_err(|e| parse_error(e, &reply.body))?;
        let (content, tokens_used) = extract(api_response)?;

        Ok(GenerationResponse {
            id: response_id(ProviderKind::OpenAi),
            provider: ProviderKind::OpenAi,
            model: model.to_string(),
            content,
            tokens_used,
            duration: started.elapsed(),
            generated_at: Utc::now(),
        })
    }
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ---------- API request/response types ----------

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

/// System message, when present, leads the conversation.
fn build_request<'a>(model: &'a str, request: &'a GenerationRequest) -> ApiRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
        messages.push(ApiMessage {
            role: "system",
            content: system,
        });
    }
    messages.push(ApiMessage {
        role: "user",
        content: &request.prompt,
    });

    ApiRequest {
        model,
        messages,
        max_tokens: request.max_tokens.filter(|&n| n > 0),
        temperature: request.temperature,
    }
}

fn extract(response: ApiResponse) -> Result<(String, u64), UpstreamError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(UpstreamError::Empty("no choices in OpenAI response"))?;
    let content = choice.message.content.unwrap_or_default();
    let tokens = match response.usage {
        Some(usage) => usage.total_tokens,
        None => estimate_tokens(&content),
    };
    Ok((content, tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_message_leads() {
        let req = GenerationRequest::new(ProviderKind::OpenAi, "Write hello world")
            .with_system("You are terse")
            .with_max_tokens(100)
            .with_temperature(0.2);
        let value = serde_json::to_value(build_request("gpt-4", &req)).unwrap();

        assert_eq!(value["model"], "gpt-4");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][0]["content"], "You are terse");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "Write hello world");
        assert_eq!(value["max_tokens"], 100);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let req = GenerationRequest::new(ProviderKind::OpenAi, "hi").with_max_tokens(0);
        let value = serde_json::to_value(build_request("gpt-3.5-turbo", &req)).unwrap();

        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert!(value.get("max_tokens").is_none());
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn test_extract_reads_usage() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"}}],
                "usage":{"prompt_tokens":5,"completion_tokens":2,"total_tokens":7}}"#,
        )
        .unwrap();
        assert_eq!(extract(response).unwrap(), ("Hello!".to_string(), 7));
    }

    #[test]
    fn test_extract_estimates_without_usage() {
        let response: ApiResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"12345678"}}]}"#).unwrap();
        assert_eq!(extract(response).unwrap(), ("12345678".to_string(), 2));
    }

    #[test]
    fn test_extract_rejects_zero_choices() {
        let response: ApiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract(response), Err(UpstreamError::Empty(_))));
    }
}
