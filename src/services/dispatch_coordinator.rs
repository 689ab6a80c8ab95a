//! Dispatch Coordinator
//!
//! Executes a resolved workflow plan against the provider registry:
//!
//! 1. Pass 1: one call per roster slot, all at once or one at a time with a
//!    fixed pause, per the plan's [`DispatchStrategy`].
//! 2. Every failed slot gets exactly one substitute: the first reachable
//!    backend (sorted by id) the plan does not use and no other slot took.
//!    Substitutes are picked after the pass-1 join, so the choice does not
//!    depend on completion order.
//! 3. An even pass-1 response count triggers the tie-breaker, if planned.
//! 4. Pass 2: the synthesizer receives every pass-1 response with
//!    attribution; its consolidated answer joins the response set.
//!
//! Failures never abort dispatch. An empty response set is reported as-is;
//! the caller decides that it is fatal.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::models::{
    BackendId, DispatchConfig, DispatchStrategy, ModelResponse, ResponseOrigin, RetryConfig,
    RosterEntry, SlotFailure, WorkflowPlan,
};
use crate::domain::ports::{GenerationRequest, ProviderError};
use crate::infrastructure::providers::{CallPolicy, ProviderRegistry, RetryPolicy};

/// Responses and per-slot failures from one dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// Validated responses, in slot order
    pub responses: Vec<ModelResponse>,
    /// Slots that produced nothing
    pub failures: Vec<SlotFailure>,
}

/// One planned call.
#[derive(Debug, Clone)]
struct Slot {
    backend: BackendId,
    model_id: String,
    origin: ResponseOrigin,
}

impl Slot {
    fn from_entry(entry: &RosterEntry, origin: ResponseOrigin) -> Self {
        Self {
            backend: entry.backend.clone(),
            model_id: entry.model_id.clone(),
            origin,
        }
    }
}

/// Runs a workflow plan against the provider registry.
pub struct DispatchCoordinator {
    registry: Arc<ProviderRegistry>,
    policy: CallPolicy,
    max_tokens: u32,
    synthesis_max_tokens: u32,
    temperature: f32,
}

impl DispatchCoordinator {
    /// Coordinator using the `dispatch` and `retry` config sections.
    pub fn new(registry: Arc<ProviderRegistry>, dispatch: &DispatchConfig, retry: &RetryConfig) -> Self {
        Self {
            registry,
            policy: CallPolicy {
                timeout: Duration::from_secs(dispatch.call_timeout_secs),
                retry: RetryPolicy::from_config(retry),
            },
            max_tokens: dispatch.max_tokens,
            synthesis_max_tokens: dispatch.synthesis_max_tokens,
            temperature: dispatch.temperature,
        }
    }

    /// Override the per-call timeout and retry policy.
    #[must_use]
    pub fn with_call_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Registry calls are routed through.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Run both passes of a plan.
    pub async fn dispatch(
        &self,
        plan: &WorkflowPlan,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        let mut substitutes_taken: BTreeSet<BackendId> = BTreeSet::new();

        let primaries: Vec<Slot> = plan
            .pass_one()
            .iter()
            .map(|entry| Slot::from_entry(entry, ResponseOrigin::Roster))
            .collect();
        info!(
            depth = %plan.depth,
            slots = primaries.len(),
            strategy = ?plan.strategy,
            "dispatching pass 1"
        );

        let results = self
            .run_batch(&primaries, plan.strategy, prompt, system_prompt, self.max_tokens, false)
            .await;

        // Slot-ordered results; failed slots are filled by substitutes below
        let mut slots: Vec<Option<ModelResponse>> = Vec::with_capacity(results.len());
        let mut retries: Vec<(usize, Slot)> = Vec::new();
        for (idx, (slot, result)) in primaries.iter().zip(results).enumerate() {
            match result {
                Ok(response) => slots.push(Some(response)),
                Err(err) => {
                    let substitute = self.pick_substitute(plan, &substitutes_taken);
                    warn!(
                        backend = %slot.backend,
                        error = %err,
                        kind = ?err.failure_kind(),
                        substitute = ?substitute.as_ref().map(|s| s.backend.as_str()),
                        "roster slot failed"
                    );
                    if let Some(substitute) = &substitute {
                        substitutes_taken.insert(substitute.backend.clone());
                        retries.push((idx, Slot {
                            origin: ResponseOrigin::Substitute {
                                replaced: slot.backend.clone(),
                            },
                            ..substitute.clone()
                        }));
                    }
                    outcome.failures.push(Self::failure(&slot.backend, &err, substitute.map(|s| s.backend)));
                    slots.push(None);
                }
            }
        }

        if !retries.is_empty() {
            let subs: Vec<Slot> = retries.iter().map(|(_, slot)| slot.clone()).collect();
            let results = self
                .run_batch(&subs, plan.strategy, prompt, system_prompt, self.max_tokens, true)
                .await;
            for ((idx, slot), result) in retries.iter().zip(results) {
                match result {
                    Ok(response) => {
                        Self::mark_recovered(&mut outcome.failures, &slot.backend);
                        slots[*idx] = Some(response);
                    }
                    Err(err) => {
                        warn!(backend = %slot.backend, error = %err, "substitute failed, dropping slot");
                    }
                }
            }
        }

        outcome.responses = slots.into_iter().flatten().collect();

        self.run_tie_breaker(plan, prompt, system_prompt, &mut outcome).await;

        if let Some(synthesizer) = plan.synthesizer() {
            if outcome.responses.is_empty() {
                warn!(backend = %synthesizer.backend, "no pass-1 responses, skipping synthesis");
            } else {
                self.run_synthesis(plan, synthesizer, prompt, system_prompt, &mut substitutes_taken, &mut outcome)
                    .await;
            }
        }

        info!(
            responses = outcome.responses.len(),
            failures = outcome.failures.len(),
            "dispatch complete"
        );
        outcome
    }

    async fn run_tie_breaker(
        &self,
        plan: &WorkflowPlan,
        prompt: &str,
        system_prompt: Option<&str>,
        outcome: &mut DispatchOutcome,
    ) {
        let Some(entry) = &plan.tie_breaker else {
            return;
        };
        let count = outcome.responses.len();
        if count < 2 || count % 2 == 1 {
            return;
        }
        if !self.registry.is_available(entry.backend.as_str()) {
            debug!(backend = %entry.backend, "tie-breaker unavailable");
            return;
        }

        let slot = Slot::from_entry(entry, ResponseOrigin::TieBreaker);
        let mut results = self
            .run_batch(&[slot], plan.strategy, prompt, system_prompt, self.max_tokens, true)
            .await;
        match results.pop() {
            Some(Ok(response)) => {
                debug!(backend = %entry.backend, "tie-breaker responded");
                outcome.responses.push(response);
            }
            Some(Err(err)) => {
                warn!(backend = %entry.backend, error = %err, "tie-breaker failed");
                outcome.failures.push(Self::failure(&entry.backend, &err, None));
            }
            None => {}
        }
    }

    async fn run_synthesis(
        &self,
        plan: &WorkflowPlan,
        synthesizer: &RosterEntry,
        prompt: &str,
        system_prompt: Option<&str>,
        substitutes_taken: &mut BTreeSet<BackendId>,
        outcome: &mut DispatchOutcome,
    ) {
        let synthesis_prompt = synthesis_prompt(prompt, &outcome.responses);
        info!(
            backend = %synthesizer.backend,
            inputs = outcome.responses.len(),
            "dispatching synthesis pass"
        );

        let primary = Slot::from_entry(synthesizer, ResponseOrigin::Synthesis);
        let err = match self.call(&primary, &synthesis_prompt, system_prompt, self.synthesis_max_tokens).await {
            Ok(response) => {
                outcome.responses.push(response);
                return;
            }
            Err(err) => err,
        };

        let substitute = self.pick_substitute(plan, substitutes_taken);
        warn!(
            backend = %synthesizer.backend,
            error = %err,
            substitute = ?substitute.as_ref().map(|s| s.backend.as_str()),
            "synthesizer failed"
        );
        outcome.failures.push(Self::failure(
            &synthesizer.backend,
            &err,
            substitute.as_ref().map(|s| s.backend.clone()),
        ));

        let Some(substitute) = substitute else {
            return;
        };
        substitutes_taken.insert(substitute.backend.clone());
        let slot = Slot {
            origin: ResponseOrigin::Synthesis,
            ..substitute
        };
        match self.call(&slot, &synthesis_prompt, system_prompt, self.synthesis_max_tokens).await {
            Ok(response) => {
                Self::mark_recovered(&mut outcome.failures, &slot.backend);
                outcome.responses.push(response);
            }
            Err(err) => {
                warn!(backend = %slot.backend, error = %err, "substitute synthesizer failed, skipping pass 2");
            }
        }
    }

    /// Issue calls concurrently, or one by one with the strategy's delay.
    ///
    /// `delay_first` inserts the delay before the first call too, for batches
    /// that follow earlier calls in the same request.
    async fn run_batch(
        &self,
        slots: &[Slot],
        strategy: DispatchStrategy,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: u32,
        delay_first: bool,
    ) -> Vec<Result<ModelResponse, ProviderError>> {
        match strategy.delay() {
            None => {
                join_all(
                    slots
                        .iter()
                        .map(|slot| self.call(slot, prompt, system_prompt, max_tokens)),
                )
                .await
            }
            Some(delay) => {
                let mut results = Vec::with_capacity(slots.len());
                for (idx, slot) in slots.iter().enumerate() {
                    if idx > 0 || delay_first {
                        debug!(delay_ms = delay.as_millis() as u64, "throttling sequential dispatch");
                        sleep(delay).await;
                    }
                    results.push(self.call(slot, prompt, system_prompt, max_tokens).await);
                }
                results
            }
        }
    }

    async fn call(
        &self,
        slot: &Slot,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: u32,
    ) -> Result<ModelResponse, ProviderError> {
        let request = GenerationRequest {
            prompt: prompt.to_string(),
            system_prompt: system_prompt.map(str::to_string),
            model_id: slot.model_id.clone(),
            max_tokens,
            temperature: self.temperature,
        };
        self.registry
            .invoke(&slot.backend, &request, slot.origin.clone(), &self.policy)
            .await
    }

    /// First reachable backend, by id, that the plan does not use and no
    /// earlier slot has taken. Mapped to its canonical model.
    fn pick_substitute(&self, plan: &WorkflowPlan, taken: &BTreeSet<BackendId>) -> Option<Slot> {
        self.registry
            .available()
            .into_iter()
            .filter(|id| !plan.uses(id) && !taken.contains(id))
            .find_map(|id| {
                self.registry.profile(id.as_str()).map(|profile| Slot {
                    model_id: profile.default_model.clone(),
                    backend: id.clone(),
                    origin: ResponseOrigin::Roster,
                })
            })
    }

    fn failure(backend: &BackendId, err: &ProviderError, substitute: Option<BackendId>) -> SlotFailure {
        SlotFailure {
            backend: backend.clone(),
            kind: err.failure_kind(),
            error: err.to_string(),
            substitute,
            recovered: false,
        }
    }

    fn mark_recovered(failures: &mut [SlotFailure], substitute: &BackendId) {
        if let Some(failure) = failures
            .iter_mut()
            .find(|f| f.substitute.as_ref() == Some(substitute))
        {
            failure.recovered = true;
        }
    }
}

/// Pass-2 prompt carrying every pass-1 response with its attribution.
pub fn synthesis_prompt(question: &str, responses: &[ModelResponse]) -> String {
    let mut prompt = format!(
        "Original research question:\n{question}\n\n\
         Below are {} independent responses from different models. \
         Consolidate them into a single accurate account, keeping what they agree on \
         and calling out where they conflict.\n",
        responses.len()
    );
    for response in responses {
        prompt.push_str(&format!(
            "\n### Response from {} ({})\n{}\n",
            response.backend, response.model_id, response.text
        ));
    }
    prompt
}
