use tokio_util::sync::CancellationToken;

use super::{ClientSettings, GenerationRequest, GenerationResponse, ProviderKind, ProviderProfile};
use crate::core::error::UpstreamError;

pub(crate) static PROFILE: ProviderProfile = ProviderProfile {
    display_name: "Anthropic Claude",
    default_model: "claude-3-sonnet-20240229",
    default_base_url: "https://api.anthropic.com/v1",
    max_tokens: 8192,
    temperature: (0.0, 1.0),
    supported_models: &[
        "claude-3-opus-20240229",
        "claude-3-sonnet-20240229",
        "claude-3-haiku-20240307",
    ],
    strengths: &[
        "Strong safety focus",
        "Excellent at analysis",
        "Good refusal mechanisms",
        "Thoughtful responses",
    ],
    weaknesses: &[
        "More conservative responses",
        "Limited availability",
        "Higher cost",
    ],
    best_for: &[
        "Safety-critical applications",
        "Research and analysis",
        "Ethical AI use cases",
    ],
    pricing: "Pay per token (premium pricing)",
};

/// Anthropic is configurable but has no wire implementation yet.
/// It always reports unavailable, so the dispatcher never reaches `generate`.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    pub(super) settings: ClientSettings,
}

impl AnthropicClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    pub fn is_available(&self) -> bool {
        false
    }

    pub async fn generate(
        &self,
        _cancel: &CancellationToken,
        _request: &GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        Err(UpstreamError::NotImplemented(ProviderKind::Anthropic))
    }
}
