//! Integration tests: single-provider dispatch through the public API.
//!
//! Every test runs against `FakeTransport`, so call counts prove which
//! requests were rejected before reaching the network.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use prism::core::dispatcher::Dispatcher;
use prism::core::error::{ErrorKind, GatewayError, UpstreamError, ValidationError};
use prism::core::registry::ProviderRegistry;
use prism::providers::{GenerationRequest, ProviderKind, estimate_tokens};

use common::{FakeTransport, registry};

// ---------- Helpers ----------

fn dispatcher(kinds: &[ProviderKind], transport: &Arc<FakeTransport>) -> Dispatcher {
    Dispatcher::new(registry(kinds, transport.clone()))
}

async fn dispatch(
    dispatcher: &Dispatcher,
    request: GenerationRequest,
) -> Result<prism::providers::GenerationResponse, GatewayError> {
    dispatcher.generate(&CancellationToken::new(), &request).await
}

// ---------- Validation ----------

#[tokio::test]
async fn test_empty_prompt_never_reaches_transport() {
    let transport = Arc::new(FakeTransport::new());
    let dispatcher = dispatcher(&[ProviderKind::OpenAi, ProviderKind::Gemini], &transport);

    for kind in [ProviderKind::OpenAi, ProviderKind::Gemini] {
        for prompt in ["", "   ", "\n\t"] {
            let err = dispatch(&dispatcher, GenerationRequest::new(kind, prompt))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                GatewayError::Validation(ValidationError::EmptyPrompt)
            ));
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    assert_eq!(transport.total_calls(), 0);
}

#[tokio::test]
async fn test_max_tokens_ceilings() {
    let transport = Arc::new(FakeTransport::new());
    let dispatcher = dispatcher(&[ProviderKind::OpenAi, ProviderKind::Gemini], &transport);

    let over = [(ProviderKind::OpenAi, 4097), (ProviderKind::Gemini, 8193)];
    for (kind, max_tokens) in over {
        let err = dispatch(
            &dispatcher,
            GenerationRequest::new(kind, "hello").with_max_tokens(max_tokens),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Validation(ValidationError::MaxTokensExceeded { .. })
        ));
    }
    assert_eq!(transport.total_calls(), 0);

    let at_limit = [(ProviderKind::OpenAi, 4096), (ProviderKind::Gemini, 8192)];
    for (kind, max_tokens) in at_limit {
        dispatch(
            &dispatcher,
            GenerationRequest::new(kind, "hello").with_max_tokens(max_tokens),
        )
        .await
        .unwrap();
    }
    assert_eq!(transport.total_calls(), 2);
}

#[tokio::test]
async fn test_temperature_ranges() {
    let transport = Arc::new(FakeTransport::new());
    let dispatcher = dispatcher(&[ProviderKind::OpenAi, ProviderKind::Gemini], &transport);

    let accepted = [
        (ProviderKind::OpenAi, 0.0),
        (ProviderKind::OpenAi, 2.0),
        (ProviderKind::Gemini, 0.0),
        (ProviderKind::Gemini, 1.0),
    ];
    for (kind, temperature) in accepted {
        let result = dispatch(
            &dispatcher,
            GenerationRequest::new(kind, "hello").with_temperature(temperature),
        )
        .await;
        assert!(result.is_ok(), "{kind} at {temperature} should pass");
    }

    let rejected = [
        (ProviderKind::OpenAi, -0.1),
        (ProviderKind::OpenAi, 2.1),
        (ProviderKind::Gemini, -0.1),
        (ProviderKind::Gemini, 1.1),
    ];
    for (kind, temperature) in rejected {
        let err = dispatch(
            &dispatcher,
            GenerationRequest::new(kind, "hello").with_temperature(temperature),
        )
        .await
        .unwrap_err();
        assert!(
            matches!(
                err,
                GatewayError::Validation(ValidationError::TemperatureOutOfRange { .. })
            ),
            "{kind} at {temperature} should be rejected"
        );
    }

    assert_eq!(transport.total_calls(), accepted.len());
}

// ---------- Lookup ----------

#[tokio::test]
async fn test_empty_registry_reports_no_providers() {
    let dispatcher = Dispatcher::new(Arc::new(ProviderRegistry::default()));
    let err = dispatch(&dispatcher, GenerationRequest::new(ProviderKind::OpenAi, "hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::NoProvidersConfigured));
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn test_unknown_provider_names_available_set() {
    let transport = Arc::new(FakeTransport::new());
    let dispatcher = dispatcher(&[ProviderKind::Gemini], &transport);

    let err = dispatch(&dispatcher, GenerationRequest::new(ProviderKind::OpenAi, "hi"))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "provider openai not found. Available providers: [gemini]"
    );
    assert_eq!(err.kind(), ErrorKind::ProviderNotConfigured);
}

#[tokio::test]
async fn test_anthropic_is_registered_but_unavailable() {
    let transport = Arc::new(FakeTransport::new());
    let dispatcher = dispatcher(&[ProviderKind::Anthropic], &transport);

    let err = dispatch(
        &dispatcher,
        GenerationRequest::new(ProviderKind::Anthropic, "hi"),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        GatewayError::ProviderUnavailable(ProviderKind::Anthropic)
    ));
    assert_eq!(transport.total_calls(), 0);
}

// ---------- Upstream ----------

#[tokio::test]
async fn test_success_normalizes_response() {
    let transport = Arc::new(FakeTransport::new());
    let dispatcher = dispatcher(&[ProviderKind::OpenAi, ProviderKind::Gemini], &transport);

    let openai = dispatch(
        &dispatcher,
        GenerationRequest::new(ProviderKind::OpenAi, "Name a color").with_model("gpt-4"),
    )
    .await
    .unwrap();
    assert_eq!(openai.provider, ProviderKind::OpenAi);
    assert_eq!(openai.model, "gpt-4");
    assert_eq!(openai.content, "openai: Name a color");
    assert!(openai.id.starts_with("openai-"));

    let gemini = dispatch(
        &dispatcher,
        GenerationRequest::new(ProviderKind::Gemini, "Name a color"),
    )
    .await
    .unwrap();
    assert_eq!(gemini.model, "gemini-1.5-flash");
    assert_eq!(gemini.content, "gemini: Name a color");
    assert_eq!(gemini.tokens_used, estimate_tokens(&gemini.content));

    assert_eq!(transport.calls(ProviderKind::OpenAi), 1);
    assert_eq!(transport.calls(ProviderKind::Gemini), 1);
}

#[tokio::test]
async fn test_upstream_failure_is_not_retried() {
    let transport = Arc::new(FakeTransport::new().failing(ProviderKind::OpenAi));
    let dispatcher = dispatcher(&[ProviderKind::OpenAi], &transport);

    let err = dispatch(&dispatcher, GenerationRequest::new(ProviderKind::OpenAi, "hi"))
        .await
        .unwrap_err();

    match &err {
        GatewayError::Upstream {
            provider,
            source: UpstreamError::Status { status, body },
        } => {
            assert_eq!(*provider, ProviderKind::OpenAi);
            assert_eq!(*status, 500);
            assert!(body.contains("internal error"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(transport.calls(ProviderKind::OpenAi), 1);
}

#[tokio::test]
async fn test_token_estimate_is_deterministic() {
    let transport = Arc::new(FakeTransport::new());
    let dispatcher = dispatcher(&[ProviderKind::Gemini], &transport);
    let request = GenerationRequest::new(ProviderKind::Gemini, "The same prompt every time");

    let first = dispatch(&dispatcher, request.clone()).await.unwrap();
    let second = dispatch(&dispatcher, request).await.unwrap();

    assert_eq!(first.content, second.content);
    assert_eq!(first.tokens_used, second.tokens_used);
    assert_ne!(first.id, second.id);
}

// ---------- Cancellation ----------

#[tokio::test]
async fn test_cancellation_interrupts_in_flight_call() {
    let transport = Arc::new(FakeTransport::new().hanging());
    let dispatcher = dispatcher(&[ProviderKind::OpenAi], &transport);
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let request = GenerationRequest::new(ProviderKind::OpenAi, "hi");
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        dispatcher.generate(&cancel, &request),
    )
    .await
    .expect("cancellation should end the call promptly");

    assert!(matches!(
        result,
        Err(GatewayError::Upstream {
            source: UpstreamError::Cancelled,
            ..
        })
    ));
    assert_eq!(transport.calls(ProviderKind::OpenAi), 1);
}
