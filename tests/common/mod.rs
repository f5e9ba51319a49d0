//! Shared fixtures: a scriptable in-memory transport and registry builders.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use prism::core::config::GatewayConfig;
use prism::core::registry::ProviderRegistry;
use prism::providers::{HttpReply, HttpRequest, ProviderKind, Transport, TransportError};

pub const OPENAI_KEY: &str = "sk-test-abcdefghijklmnop";
pub const GEMINI_KEY: &str = "AIzaSy-test-abcdefghijkl";
pub const ANTHROPIC_KEY: &str = "sk-ant-test-abcdefghijkl";

/// Transport that answers like the real APIs without touching the network.
///
/// Providers listed in `failing`, or named in the prompt as `fail:<provider>`,
/// get an HTTP 500. Latency, when set, is a deterministic pseudo-random value
/// in `[min, max]` per call.
#[derive(Default)]
pub struct FakeTransport {
    failing: HashSet<ProviderKind>,
    latency: Option<(u64, u64)>,
    hang: bool,
    seed: AtomicU64,
    openai_calls: AtomicUsize,
    gemini_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            seed: AtomicU64::new(0x2545_f491_4f6c_dd1d),
            ..Default::default()
        }
    }

    pub fn failing(mut self, kind: ProviderKind) -> Self {
        self.failing.insert(kind);
        self
    }

    pub fn with_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.latency = Some((min_ms, max_ms));
        self
    }

    /// Never reply; only cancellation ends the call.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn calls(&self, kind: ProviderKind) -> usize {
        match kind {
            ProviderKind::OpenAi => self.openai_calls.load(Ordering::SeqCst),
            ProviderKind::Gemini => self.gemini_calls.load(Ordering::SeqCst),
            ProviderKind::Anthropic => 0,
        }
    }

    pub fn total_calls(&self) -> usize {
        self.calls(ProviderKind::OpenAi) + self.calls(ProviderKind::Gemini)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_delay(&self) -> Option<Duration> {
        let (min, max) = self.latency?;
        let mut x = self.seed.fetch_add(0x9e37_79b9_7f4a_7c15, Ordering::Relaxed);
        x ^= x >> 33;
        x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
        x ^= x >> 33;
        let span = max.saturating_sub(min) + 1;
        Some(Duration::from_millis(min + x % span))
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpReply, TransportError> {
        let kind = if request.url.contains("generateContent") {
            self.gemini_calls.fetch_add(1, Ordering::SeqCst);
            ProviderKind::Gemini
        } else if request.url.ends_with("/chat/completions") {
            self.openai_calls.fetch_add(1, Ordering::SeqCst);
            ProviderKind::OpenAi
        } else {
            return Err(TransportError(format!("unexpected url {}", request.url)));
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.next_delay() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let prompt = prompt_of(kind, &request.body);
        if self.failing.contains(&kind) || prompt.contains(&format!("fail:{kind}")) {
            return Ok(HttpReply {
                status: 500,
                body: r#"{"error":{"message":"internal error"}}"#.to_string(),
            });
        }

        let body = match kind {
            ProviderKind::OpenAi => json!({
                "choices": [{ "message": { "role": "assistant", "content": format!("openai: {prompt}") } }]
            }),
            _ => json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "gemini: " }, { "text": prompt }] }
                }]
            }),
        };
        Ok(HttpReply {
            status: 200,
            body: body.to_string(),
        })
    }
}

/// The user prompt as each wire format carries it.
fn prompt_of(kind: ProviderKind, body: &Value) -> String {
    let text = match kind {
        ProviderKind::OpenAi => body["messages"]
            .as_array()
            .and_then(|m| m.last())
            .and_then(|m| m["content"].as_str()),
        _ => body["contents"][0]["parts"][0]["text"].as_str(),
    };
    text.unwrap_or_default().to_string()
}

// ---------- Registry helpers ----------

/// Config with live keys for the given providers only.
pub fn config_with(kinds: &[ProviderKind]) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    for &kind in kinds {
        config.providers.get_mut(kind).api_key = match kind {
            ProviderKind::OpenAi => OPENAI_KEY,
            ProviderKind::Gemini => GEMINI_KEY,
            ProviderKind::Anthropic => ANTHROPIC_KEY,
        }
        .to_string();
    }
    config
}

pub fn registry(kinds: &[ProviderKind], transport: Arc<FakeTransport>) -> Arc<ProviderRegistry> {
    Arc::new(ProviderRegistry::with_transport(&config_with(kinds), transport))
}
