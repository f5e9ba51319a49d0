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
    display_name: "Google Gemini",
    default_model: "gemini-1.5-flash",
    default_base_url: "https://generativelanguage.googleapis.com",
    max_tokens: 8192,
    temperature: (0.0, 1.0),
    supported_models: &[
        "gemini-1.5-flash",
        "gemini-1.5-pro",
        "gemini-1.0-pro",
        "gemini-pro-vision",
    ],
    strengths: &[
        "Multimodal capabilities",
        "Large context window",
        "Good at reasoning tasks",
        "Free tier available",
        "Fast response times",
    ],
    weaknesses: &[
        "Less mature than OpenAI",
        "Limited third-party integrations",
        "Newer model with less community support",
    ],
    best_for: &[
        "Multimodal tasks",
        "Long document analysis",
        "Research and analysis",
        "Cost-effective solutions",
    ],
    pricing: "Free tier available, pay per token for pro usage",
};

/// Generative-model client for the Gemini `generateContent` API.
///
/// Token usage is always estimated from the content length so identical
/// content yields identical counts.
#[derive(Clone)]
pub struct GeminiClient {
    pub(super) settings: ClientSettings,
    transport: Arc<dyn Transport>,
}

impl GeminiClient {
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

        let body = serde_json::to_value(build_request(request))
            .map_err(|e| UpstreamError::Encode(e.to_string()))?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.settings.base_url.trim_end_matches('/'),
            model,
            self.settings.api_key
        );

        let reply = send(self.transport.as_ref(), cancel, HttpRequest::post(url, body)).await?;
        let api_response: ApiResponse =
            serde_json::from_str(&reply.body).map_err(|e| parse_error(e, &reply.body))?;
        let content = extract(api_response)?;
        let tokens_used = estimate_tokens(&content);

        Ok(GenerationResponse {
            id: response_id(ProviderKind::Gemini),
            provider: ProviderKind::Gemini,
            model: model.to_string(),
            content,
            tokens_used,
            duration: started.elapsed(),
            generated_at: Utc::now(),
        })
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ---------- API request/response types ----------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn build_request(request: &GenerationRequest) -> ApiRequest<'_> {
    let system_instruction = request
        .system
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|text| Content {
            role: None,
            parts: vec![Part { text }],
        });

    let max_output_tokens = request.max_tokens.filter(|&n| n > 0);
    let generation_config = (max_output_tokens.is_some() || request.temperature.is_some())
        .then_some(GenerationConfig {
            max_output_tokens,
            temperature: request.temperature,
        });

    ApiRequest {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part {
                text: &request.prompt,
            }],
        }],
        system_instruction,
        generation_config,
    }
}

/// Concatenated text of the first candidate's parts.
fn extract(response: ApiResponse) -> Result<String, UpstreamError> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    if parts.is_empty() {
        return Err(UpstreamError::Empty("no response from Gemini"));
    }

    Ok(parts.into_iter().filter_map(|p| p.text).collect())
}
