//! Provider registry.
//!
//! Built once at startup from a [`GatewayConfig`] snapshot. Only providers
//! whose credential passes the [`CredentialPolicy`](crate::core::credential::CredentialPolicy)
//! get a client; the rest are absent. The registry is never mutated after
//! construction, so it is shared as `Arc<ProviderRegistry>` and read
//! concurrently without locking.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::config::GatewayConfig;
use crate::providers::{ProviderClient, ProviderKind, ReqwestTransport, Transport};

#[derive(Debug, Default)]
pub struct ProviderRegistry {
    clients: BTreeMap<ProviderKind, ProviderClient>,
}

/// Display entry for one provider family, available or not.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderDescriptor {
    pub provider: ProviderKind,
    pub name: &'static str,
    pub available: bool,
    pub models: &'static [&'static str],
    pub max_tokens: u32,
    pub strengths: &'static [&'static str],
    pub weaknesses: &'static [&'static str],
    pub best_for: &'static [&'static str],
    pub pricing: &'static str,
}

impl ProviderRegistry {
    /// Build the registry with the production HTTP transport.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build the registry over a caller-supplied transport. No network calls
    /// are made here: availability is credential presence only.
    pub fn with_transport(config: &GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        let mut clients = BTreeMap::new();

        for kind in ProviderKind::ALL {
            let key = &config.providers.get(kind).api_key;
            if !config.credentials.is_live(key) {
                if key.trim().is_empty() {
                    debug!(provider = %kind, "no API key configured, skipping");
                } else {
                    warn!(provider = %kind, "API key looks like a placeholder, skipping");
                }
                continue;
            }

            let client = ProviderClient::build(kind, config.client_settings(kind), transport.clone());
            info!(
                provider = %kind,
                available = client.is_available(),
                "registered provider"
            );
            clients.insert(kind, client);
        }

        if clients.is_empty() {
            warn!("No AI providers configured - generation requests will fail");
        }

        Self { clients }
    }

    /// Registry over pre-built clients. Later duplicates replace earlier ones.
    pub fn from_clients(clients: impl IntoIterator<Item = ProviderClient>) -> Self {
        Self {
            clients: clients.into_iter().map(|c| (c.kind(), c)).collect(),
        }
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&ProviderClient> {
        self.clients.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Registered provider kinds in stable order.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.clients.keys().copied().collect()
    }

    /// Every known family, including those without a client.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        ProviderKind::ALL
            .into_iter()
            .map(|kind| {
                let profile = kind.profile();
                let client = self.clients.get(&kind);
                ProviderDescriptor {
                    provider: kind,
                    name: profile.display_name,
                    available: client.is_some_and(ProviderClient::is_available),
                    models: profile.supported_models,
                    max_tokens: client.map_or(profile.max_tokens, ProviderClient::max_tokens),
                    strengths: profile.strengths,
                    weaknesses: profile.weaknesses,
                    best_for: profile.best_for,
                    pricing: profile.pricing,
                }
            })
            .collect()
    }
}
