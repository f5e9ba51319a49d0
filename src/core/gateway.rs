use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::core::compare::{ComparisonCoordinator, ComparisonRequest, ComparisonResult};
use crate::core::dispatcher::Dispatcher;
use crate::core::error::GatewayError;
use crate::core::history::{GenerationRecord, GenerationStats, GenerationStore, HistoryQuery};
use crate::core::registry::{ProviderDescriptor, ProviderRegistry};
use crate::providers::{GenerationRequest, GenerationResponse};

/// Entry point for callers: routing, fan-out and history behind one handle.
///
/// Successful generations are recorded in the store. A store failure is
/// logged and never turns a successful generation into an error.
#[derive(Clone)]
pub struct Gateway {
    dispatcher: Dispatcher,
    coordinator: ComparisonCoordinator,
    store: Arc<dyn GenerationStore>,
}

impl Gateway {
    pub fn new(registry: Arc<ProviderRegistry>, store: Arc<dyn GenerationStore>) -> Self {
        let dispatcher = Dispatcher::new(registry);
        Self {
            coordinator: ComparisonCoordinator::new(dispatcher.clone()),
            dispatcher,
            store,
        }
    }

    pub async fn generate(
        &self,
        cancel: &CancellationToken,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GatewayError> {
        let response = self.dispatcher.generate(cancel, request).await?;
        self.record(&request.prompt, &response).await;
        Ok(response)
    }

    pub async fn compare(
        &self,
        cancel: &CancellationToken,
        request: &ComparisonRequest,
    ) -> Result<ComparisonResult, GatewayError> {
        let result = self.coordinator.compare(cancel, request).await?;
        for response in &result.results {
            self.record(&request.prompt, response).await;
        }
        Ok(result)
    }

    pub fn providers(&self) -> Vec<ProviderDescriptor> {
        self.dispatcher.registry().descriptors()
    }

    pub fn history(&self, query: &HistoryQuery) -> Result<Vec<GenerationRecord>> {
        self.store.query(query)
    }

    pub fn stats(&self, query: &HistoryQuery) -> Result<GenerationStats> {
        self.store.stats(query)
    }

    /// Store writes are blocking, so they run off the async worker threads.
    async fn record(&self, prompt: &str, response: &GenerationResponse) {
        let record = GenerationRecord::from_response(prompt, response);
        let store = Arc::clone(&self.store);
        let saved = match tokio::task::spawn_blocking(move || store.save(&record)).await {
            Ok(saved) => saved,
            Err(e) => Err(anyhow::Error::new(e).context("save task did not complete")),
        };
        if let Err(e) = saved {
            error!(
                provider = %response.provider,
                response_id = %response.id,
                error = %format!("{e:#}"),
                "failed to save generation record"
            );
        }
    }
}
