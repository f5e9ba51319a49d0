use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::error::GatewayError;
use crate::core::registry::ProviderRegistry;
use crate::providers::{GenerationRequest, GenerationResponse};

/// Routes a single request to its provider.
///
/// No retries, caching or deduplication: every successful dispatch reaches
/// the upstream API exactly once.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Lookup, availability, validation, then exactly one upstream call.
    pub async fn generate(
        &self,
        cancel: &CancellationToken,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GatewayError> {
        let provider = request.provider;

        let client = match self.registry.get(provider) {
            Some(client) => client,
            None if self.registry.is_empty() => return Err(GatewayError::NoProvidersConfigured),
            None => {
                return Err(GatewayError::ProviderNotConfigured {
                    requested: provider,
                    available: self.registry.kinds(),
                });
            }
        };

        if !client.is_available() {
            return Err(GatewayError::ProviderUnavailable(provider));
        }

        client.validate(request)?;

        debug!(
            provider = %provider,
            model = request.model.as_deref().unwrap_or("<default>"),
            "dispatching generation"
        );

        client
            .generate(cancel, request)
            .await
            .map_err(|source| GatewayError::Upstream { provider, source })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::core::error::{UpstreamError, ValidationError};
    use crate::providers::{
        ClientSettings, HttpReply, HttpRequest, ProviderClient, ProviderKind, Transport,
        TransportError,
    };

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for Counting {
        async fn post_json(&self, _request: HttpRequest) -> Result<HttpReply, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = json!({
                "choices": [{ "message": { "role": "assistant", "content": "hello there" } }],
                "usage": { "total_tokens": 7 }
            });
            Ok(HttpReply {
                status: 200,
                body: body.to_string(),
            })
        }
    }

    fn dispatcher(kinds: &[ProviderKind], transport: Arc<Counting>) -> Dispatcher {
        let clients = kinds.iter().map(|&kind| {
            ProviderClient::build(
                kind,
                ClientSettings::defaults(kind, "sk-test-abcdefghijkl"),
                transport.clone(),
            )
        });
        Dispatcher::new(Arc::new(ProviderRegistry::from_clients(clients)))
    }

    #[tokio::test]
    async fn test_generate_calls_upstream_once() {
        let transport = Arc::new(Counting::default());
        let dispatcher = dispatcher(&[ProviderKind::OpenAi], transport.clone());

        let response = dispatcher
            .generate(
                &CancellationToken::new(),
                &GenerationRequest::new(ProviderKind::OpenAi, "Say hi"),
            )
            .await
            .unwrap();

        assert_eq!(response.content, "hello there");
        assert_eq!(response.tokens_used, 7);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_never_reaches_upstream() {
        let transport = Arc::new(Counting::default());
        let dispatcher = dispatcher(&[ProviderKind::OpenAi], transport.clone());

        let err = dispatcher
            .generate(
                &CancellationToken::new(),
                &GenerationRequest::new(ProviderKind::OpenAi, "   "),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Validation(ValidationError::EmptyPrompt)
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_registry_is_distinct_from_missing_provider() {
        let transport = Arc::new(Counting::default());
        let cancel = CancellationToken::new();
        let request = GenerationRequest::new(ProviderKind::Gemini, "hi");

        let err = dispatcher(&[], transport.clone())
            .generate(&cancel, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NoProvidersConfigured));

        let err = dispatcher(&[ProviderKind::OpenAi], transport.clone())
            .generate(&cancel, &request)
            .await
            .unwrap_err();
        match err {
            GatewayError::ProviderNotConfigured { requested, available } => {
                assert_eq!(requested, ProviderKind::Gemini);
                assert_eq!(available, vec![ProviderKind::OpenAi]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_rejected_before_validation() {
        let transport = Arc::new(Counting::default());
        let dispatcher = dispatcher(&[ProviderKind::Anthropic], transport.clone());

        // Empty prompt would fail validation; availability is checked first.
        let err = dispatcher
            .generate(
                &CancellationToken::new(),
                &GenerationRequest::new(ProviderKind::Anthropic, ""),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::ProviderUnavailable(ProviderKind::Anthropic)
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_token_surfaces_as_upstream_error() {
        let transport = Arc::new(Counting::default());
        let dispatcher = dispatcher(&[ProviderKind::OpenAi], transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = dispatcher
            .generate(&cancel, &GenerationRequest::new(ProviderKind::OpenAi, "hi"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Upstream {
                provider: ProviderKind::OpenAi,
                source: UpstreamError::Cancelled
            }
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_placeholder_key_never_reaches_upstream() {
        let transport = Arc::new(Counting::default());
        let client = ProviderClient::build(
            ProviderKind::OpenAi,
            ClientSettings::defaults(ProviderKind::OpenAi, "your_openai_api_key_here"),
            transport.clone(),
        );
        let dispatcher = Dispatcher::new(Arc::new(ProviderRegistry::from_clients([client])));

        let err = dispatcher
            .generate(
                &CancellationToken::new(),
                &GenerationRequest::new(ProviderKind::OpenAi, "Say hi"),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::ProviderUnavailable(ProviderKind::OpenAi)
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
