//! Provider Registry
//!
//! Explicitly constructed map of backend id to provider, each paired with its
//! catalog profile and admission gate. Injected into the workflow selector
//! (availability) and the dispatch coordinator (calls).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use super::admission::AdmissionGate;
use super::retry::RetryPolicy;
use crate::domain::models::{BackendCatalog, BackendId, BackendProfile, ModelResponse, ResponseOrigin};
use crate::domain::ports::{GenerationRequest, ModelProvider, ProviderError};

/// Timeout and retry applied to every guarded call.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    /// Upper bound on one attempt
    pub timeout: Duration,
    /// Retry schedule for transient failures
    pub retry: RetryPolicy,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

struct RegisteredBackend {
    provider: Arc<dyn ModelProvider>,
    profile: BackendProfile,
    gate: AdmissionGate,
}

/// Registry of reachable backends.
pub struct ProviderRegistry {
    catalog: BackendCatalog,
    backends: BTreeMap<BackendId, RegisteredBackend>,
}

impl ProviderRegistry {
    /// Registry over `catalog` with no providers yet.
    pub fn new(catalog: BackendCatalog) -> Self {
        Self {
            catalog,
            backends: BTreeMap::new(),
        }
    }

    /// Register a provider for a catalog backend.
    ///
    /// # Errors
    /// Returns `NotRegistered` if the backend is not in the catalog.
    pub fn register(
        &mut self,
        backend: impl Into<BackendId>,
        provider: Arc<dyn ModelProvider>,
    ) -> Result<(), ProviderError> {
        let backend = backend.into();
        let profile = self
            .catalog
            .get(backend.as_str())
            .cloned()
            .ok_or_else(|| ProviderError::NotRegistered(format!("{backend} is not in the catalog")))?;

        let gate = AdmissionGate::from_profile(&profile);
        if self
            .backends
            .insert(backend.clone(), RegisteredBackend { provider, profile, gate })
            .is_some()
        {
            warn!(backend = %backend, "provider replaced an existing registration");
        }
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_provider(
        mut self,
        backend: impl Into<BackendId>,
        provider: Arc<dyn ModelProvider>,
    ) -> Result<Self, ProviderError> {
        self.register(backend, provider)?;
        Ok(self)
    }

    /// Catalog the registry was built from.
    pub const fn catalog(&self) -> &BackendCatalog {
        &self.catalog
    }

    /// Catalog profile of `backend`.
    pub fn profile(&self, backend: &str) -> Option<&BackendProfile> {
        self.catalog.get(backend)
    }

    /// Whether the backend is registered and currently reachable.
    pub fn is_available(&self, backend: &str) -> bool {
        self.backends
            .get(backend)
            .is_some_and(|entry| entry.provider.is_available())
    }

    /// All reachable backends, sorted by id.
    pub fn available(&self) -> BTreeSet<BackendId> {
        self.backends
            .iter()
            .filter(|(_, entry)| entry.provider.is_available())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Calls currently in flight for a backend.
    pub fn in_flight(&self, backend: &str) -> usize {
        self.backends.get(backend).map_or(0, |entry| entry.gate.in_flight())
    }

    /// Issue one guarded call: admission gate, per-call timeout and bounded
    /// retry, followed by the validating parse into a `ModelResponse`.
    pub async fn invoke(
        &self,
        backend: &BackendId,
        request: &GenerationRequest,
        origin: ResponseOrigin,
        policy: &CallPolicy,
    ) -> Result<ModelResponse, ProviderError> {
        let entry = self
            .backends
            .get(backend)
            .ok_or_else(|| ProviderError::NotRegistered(backend.to_string()))?;

        let timeout_secs = policy.timeout.as_secs();
        let output = policy
            .retry
            .execute(backend, || async {
                let _permit = entry.gate.admit().await?;
                match timeout(policy.timeout, entry.provider.generate(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(timeout_secs)),
                }
            })
            .await?;

        let estimated = entry.profile.cost_for(
            u64::from(output.input_tokens),
            u64::from(output.output_tokens),
        );
        let response = ModelResponse::from_generation(
            backend.clone(),
            request.model_id.clone(),
            origin,
            output,
            estimated,
        )?;

        debug!(
            backend = %backend,
            model = %response.model_id,
            output_tokens = response.output_tokens,
            cost_usd = response.cost_usd,
            "provider call completed"
        );
        Ok(response)
    }
}
