//! Fan-out of one prompt to several providers.
//!
//! Every branch runs concurrently through the [`Dispatcher`]. Branch outcomes
//! land in index-aligned slots, so results keep the order the caller listed
//! providers in and no shared mutable state is needed. One failing branch
//! never cancels its siblings.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::dispatcher::Dispatcher;
use crate::core::error::{BranchFailure, GatewayError};
use crate::providers::{GenerationRequest, GenerationResponse, ProviderKind};

/// The same prompt sent to several providers.
///
/// Each provider is called at most once: repeated entries are dropped,
/// keeping the first occurrence, and logged as a warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub prompt: String,
    pub providers: Vec<ProviderKind>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl ComparisonRequest {
    pub fn new(prompt: impl Into<String>, providers: Vec<ProviderKind>) -> Self {
        Self {
            prompt: prompt.into(),
            providers,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Per-branch request; model and system message are always defaulted.
    fn branch(&self, provider: ProviderKind) -> GenerationRequest {
        GenerationRequest {
            provider,
            model: None,
            prompt: self.prompt.clone(),
            system: None,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub prompt: String,
    /// Successful branches only, in request order.
    pub results: Vec<GenerationResponse>,
    /// Timestamp of the first successful response; `None` when no provider
    /// was asked.
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ComparisonCoordinator {
    dispatcher: Dispatcher,
}

impl ComparisonCoordinator {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Run every branch to completion and collect the successes.
    ///
    /// Fails only when nothing succeeded and at least one branch failed; the
    /// error then carries every branch failure in request order.
    pub async fn compare(
        &self,
        cancel: &CancellationToken,
        request: &ComparisonRequest,
    ) -> Result<ComparisonResult, GatewayError> {
        let providers = dedupe(&request.providers);
        if providers.is_empty() {
            return Ok(ComparisonResult {
                prompt: request.prompt.clone(),
                results: Vec::new(),
                created_at: None,
            });
        }

        debug!(providers = providers.len(), "starting comparison");

        let branches = providers.iter().map(|&provider| {
            let branch = request.branch(provider);
            let dispatcher = &self.dispatcher;
            async move { (provider, dispatcher.generate(cancel, &branch).await) }
        });
        let outcomes = join_all(branches).await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (provider, outcome) in outcomes {
            match outcome {
                Ok(response) => results.push(response),
                Err(error) => {
                    warn!(provider = %provider, error = %error, "comparison branch failed");
                    failures.push(BranchFailure { provider, error });
                }
            }
        }

        if results.is_empty() {
            return Err(GatewayError::AllProvidersFailed(failures));
        }

        Ok(ComparisonResult {
            prompt: request.prompt.clone(),
            created_at: results.first().map(|r| r.generated_at),
            results,
        })
    }
}

/// First occurrence wins; later repeats are dropped with a warning.
fn dedupe(providers: &[ProviderKind]) -> Vec<ProviderKind> {
    let mut unique: Vec<ProviderKind> = Vec::with_capacity(providers.len());
    for &provider in providers {
        if unique.contains(&provider) {
            warn!(provider = %provider, "duplicate provider in comparison, ignoring");
        } else {
            unique.push(provider);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_keeps_first_occurrence_order() {
        let providers = [
            ProviderKind::Gemini,
            ProviderKind::OpenAi,
            ProviderKind::Gemini,
            ProviderKind::OpenAi,
        ];
        assert_eq!(
            dedupe(&providers),
            vec![ProviderKind::Gemini, ProviderKind::OpenAi]
        );
    }

    #[test]
    fn test_branch_request_inherits_shared_knobs() {
        let mut request = ComparisonRequest::new("Explain DNS", vec![ProviderKind::OpenAi]);
        request.max_tokens = Some(256);
        request.temperature = Some(0.5);

        let branch = request.branch(ProviderKind::Gemini);
        assert_eq!(branch.provider, ProviderKind::Gemini);
        assert_eq!(branch.prompt, "Explain DNS");
        assert_eq!(branch.max_tokens, Some(256));
        assert_eq!(branch.temperature, Some(0.5));
        assert!(branch.model.is_none());
        assert!(branch.system.is_none());
    }
}
