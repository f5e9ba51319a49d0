pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod transport;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::core::credential::CredentialPolicy;
use crate::core::error::{UpstreamError, ValidationError};

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use transport::{HttpReply, HttpRequest, ReqwestTransport, Transport, TransportError};

/// Characters per token used when an upstream does not report usage.
pub const CHARS_PER_TOKEN: usize = 4;

/// Upstream error bodies are cut to this many characters.
const ERROR_BODY_LIMIT: usize = 500;

/// The fixed set of provider families the gateway knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::OpenAi, Self::Gemini, Self::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
        }
    }

    /// Static catalog entry for this family.
    pub fn profile(&self) -> &'static ProviderProfile {
        match self {
            Self::OpenAi => &openai::PROFILE,
            Self::Gemini => &gemini::PROFILE,
            Self::Anthropic => &anthropic::PROFILE,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown provider: {0}. Supported: openai, gemini, anthropic")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Per-family constants and display metadata.
///
/// The descriptive fields (strengths, weaknesses, best-for, pricing) are
/// informational only and never enforced.
#[derive(Debug)]
pub struct ProviderProfile {
    pub display_name: &'static str,
    pub default_model: &'static str,
    pub default_base_url: &'static str,
    pub max_tokens: u32,
    pub temperature: (f32, f32),
    pub supported_models: &'static [&'static str],
    pub strengths: &'static [&'static str],
    pub weaknesses: &'static [&'static str],
    pub best_for: &'static [&'static str],
    pub pricing: &'static str,
}

/// Connection settings bound to one client, resolved from configuration.
#[derive(Clone)]
pub struct ClientSettings {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub max_tokens: u32,
    /// Whether `api_key` passed the credential policy. Clients with a dead
    /// key report themselves unavailable and never reach the upstream.
    pub live: bool,
}

impl ClientSettings {
    /// Settings with the family's built-in defaults. Liveness is judged by
    /// the default credential policy.
    pub fn defaults(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let profile = kind.profile();
        Self {
            live: CredentialPolicy::default().is_live(&api_key),
            api_key,
            base_url: profile.default_base_url.to_string(),
            default_model: profile.default_model.to_string(),
            max_tokens: profile.max_tokens,
        }
    }

    /// The requested model, or this client's default when none was given.
    fn resolve_model<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested.map(str::trim) {
            Some(model) if !model.is_empty() => model,
            _ => &self.default_model,
        }
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("max_tokens", &self.max_tokens)
            .field("live", &self.live)
            .finish()
    }
}

/// Request to generate content from one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub provider: ProviderKind,
    /// Empty means "use the provider default".
    #[serde(default)]
    pub model: Option<String>,
    pub prompt: String,
    #[serde(default, rename = "system_message")]
    pub system: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(provider: ProviderKind, prompt: impl Into<String>) -> Self {
        Self {
            provider,
            model: None,
            prompt: prompt.into(),
            system: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Normalized output of a successful generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// `<provider>-<uuid>`, unique per call.
    pub id: String,
    pub provider: ProviderKind,
    pub model: String,
    pub content: String,
    pub tokens_used: u64,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    pub generated_at: DateTime<Utc>,
}

/// A provider client. The set is closed: adding a family means adding a variant.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    OpenAi(OpenAiClient),
    Gemini(GeminiClient),
    Anthropic(AnthropicClient),
}

impl ProviderClient {
    /// Build the client for `kind` over a shared transport.
    pub fn build(kind: ProviderKind, settings: ClientSettings, transport: Arc<dyn Transport>) -> Self {
        match kind {
            ProviderKind::OpenAi => Self::OpenAi(OpenAiClient::new(settings, transport)),
            ProviderKind::Gemini => Self::Gemini(GeminiClient::new(settings, transport)),
            ProviderKind::Anthropic => Self::Anthropic(AnthropicClient::new(settings)),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::OpenAi(_) => ProviderKind::OpenAi,
            Self::Gemini(_) => ProviderKind::Gemini,
            Self::Anthropic(_) => ProviderKind::Anthropic,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().profile().display_name
    }

    /// Whether a usable credential is bound. Cheap and side-effect free.
    pub fn is_available(&self) -> bool {
        match self {
            Self::OpenAi(c) => c.is_available(),
            Self::Gemini(c) => c.is_available(),
            Self::Anthropic(c) => c.is_available(),
        }
    }

    /// Display catalog; never checked against `GenerationRequest::model`.
    pub fn supported_models(&self) -> &'static [&'static str] {
        self.kind().profile().supported_models
    }

    /// Token ceiling enforced by [`ProviderClient::validate`].
    pub fn max_tokens(&self) -> u32 {
        self.settings().max_tokens
    }

    pub fn validate(&self, request: &GenerationRequest) -> Result<(), ValidationError> {
        let kind = self.kind();
        check_request(kind, self.max_tokens(), kind.profile().temperature, request)
    }

    pub async fn generate(
        &self,
        cancel: &CancellationToken,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        match self {
            Self::OpenAi(c) => c.generate(cancel, request).await,
            Self::Gemini(c) => c.generate(cancel, request).await,
            Self::Anthropic(c) => c.generate(cancel, request).await,
        }
    }

    fn settings(&self) -> &ClientSettings {
        match self {
            Self::OpenAi(c) => &c.settings,
            Self::Gemini(c) => &c.settings,
            Self::Anthropic(c) => &c.settings,
        }
    }
}

/// Prompt, then token ceiling, then temperature range.
fn check_request(
    provider: ProviderKind,
    max_tokens: u32,
    (min, max): (f32, f32),
    request: &GenerationRequest,
) -> Result<(), ValidationError> {
    if request.prompt.trim().is_empty() {
        return Err(ValidationError::EmptyPrompt);
    }

    if let Some(requested) = request.max_tokens {
        if requested > max_tokens {
            return Err(ValidationError::MaxTokensExceeded {
                provider,
                limit: max_tokens,
                requested,
            });
        }
    }

    if let Some(value) = request.temperature {
        // Written this way round so NaN is rejected.
        if !(value >= min && value <= max) {
            return Err(ValidationError::TemperatureOutOfRange {
                provider,
                min,
                max,
                value,
            });
        }
    }

    Ok(())
}

/// Send through the transport unless the caller cancels first.
async fn send(
    transport: &dyn Transport,
    cancel: &CancellationToken,
    request: HttpRequest,
) -> Result<HttpReply, UpstreamError> {
    if cancel.is_cancelled() {
        return Err(UpstreamError::Cancelled);
    }

    let reply = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(UpstreamError::Cancelled),
        reply = transport.post_json(request) => {
            reply.map_err(|e| UpstreamError::Transport(e.to_string()))?
        }
    };

    if !reply.is_success() {
        return Err(UpstreamError::Status {
            status: reply.status,
            body: excerpt(&reply.body, ERROR_BODY_LIMIT),
        });
    }

    Ok(reply)
}

/// Deterministic token estimate from content length.
pub fn estimate_tokens(content: &str) -> u64 {
    (content.len() / CHARS_PER_TOKEN) as u64
}

fn response_id(kind: ProviderKind) -> String {
    format!("{}-{}", kind, uuid::Uuid::new_v4().simple())
}

fn excerpt(body: &str, limit: usize) -> String {
    body.chars().take(limit).collect()
}

fn parse_error(err: serde_json::Error, body: &str) -> UpstreamError {
    UpstreamError::Parse(format!("{}: {}", err, excerpt(body, 200)))
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
