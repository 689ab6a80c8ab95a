//! Research Orchestrator
//!
//! End-to-end request flow:
//!
//! ```text
//! validate -> select workflow -> persona -> grounding
//!          -> dispatch (under optional deadline)
//!          -> outlier isolation -> consensus -> variance -> derivatives
//!          -> assembly -> storage hand-off (spawned, never awaited)
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainResult, Phase, ResearchError};
use crate::domain::models::{
    Config, ModelResponse, OutlierReport, ResearchDepth, ResearchRequest, ResearchResult, Timing,
    WorkflowPlan,
};
use crate::domain::ports::{
    GroundingSource, NullResultSink, PersonaSource, ResultSink, StaticPersonaSource,
};
use crate::infrastructure::providers::{CallPolicy, ProviderRegistry};
use crate::services::{
    AssemblyInput, ConsensusCalculator, DerivativeDeriver, DispatchCoordinator, DispatchOutcome,
    OutlierIsolator, ResultAssembler, VarianceAnalyzer, WorkflowSelector,
};

/// Wires the pipeline services to their collaborators.
pub struct ResearchOrchestrator {
    selector: WorkflowSelector,
    dispatcher: DispatchCoordinator,
    outliers: OutlierIsolator,
    consensus: ConsensusCalculator,
    variance: VarianceAnalyzer,
    derivatives: DerivativeDeriver,
    assembler: ResultAssembler,
    personas: Arc<dyn PersonaSource>,
    grounding: Option<Arc<dyn GroundingSource>>,
    sink: Arc<dyn ResultSink>,
    default_deadline_secs: Option<u64>,
}

impl ResearchOrchestrator {
    /// Build an orchestrator from configuration and a populated registry.
    ///
    /// The registry's catalog drives selection; `config.catalog` is only
    /// used to build registries.
    pub fn new(config: &Config, registry: Arc<ProviderRegistry>) -> Self {
        let selector = WorkflowSelector::new(
            registry.catalog().clone(),
            config.projection.clone(),
            config.dispatch.sequential_delay_ms,
        );
        let dispatcher = DispatchCoordinator::new(registry, &config.dispatch, &config.retry);

        Self {
            selector,
            dispatcher,
            outliers: OutlierIsolator::new(config.analysis.clone()),
            consensus: ConsensusCalculator::from_config(&config.analysis),
            variance: VarianceAnalyzer::from_config(&config.analysis),
            derivatives: DerivativeDeriver::from_config(&config.analysis),
            assembler: ResultAssembler::from_config(&config.analysis),
            personas: Arc::new(StaticPersonaSource::new()),
            grounding: None,
            sink: Arc::new(NullResultSink::new()),
            default_deadline_secs: config.dispatch.request_deadline_secs,
        }
    }

    /// Use `personas` to resolve request personas.
    #[must_use]
    pub fn with_personas(mut self, personas: Arc<dyn PersonaSource>) -> Self {
        self.personas = personas;
        self
    }

    /// Prepend grounding context to every prompt.
    #[must_use]
    pub fn with_grounding(mut self, grounding: Arc<dyn GroundingSource>) -> Self {
        self.grounding = Some(grounding);
        self
    }

    /// Hand completed results to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Override the per-call timeout and retry policy.
    #[must_use]
    pub fn with_call_policy(mut self, policy: CallPolicy) -> Self {
        self.dispatcher = self.dispatcher.with_call_policy(policy);
        self
    }

    /// Validate a request and resolve its workflow against current availability.
    pub fn plan(&self, request: &ResearchRequest) -> DomainResult<WorkflowPlan> {
        request.validate(self.selector.catalog())?;
        let available = self.dispatcher.registry().available();
        self.selector.select(request, &available)
    }

    /// Run a research request end to end.
    #[instrument(skip(self, request), fields(topic = %request.topic, depth = %request.depth))]
    pub async fn run(&self, request: ResearchRequest) -> DomainResult<ResearchResult> {
        let started_at = Utc::now();
        let plan = self.plan(&request)?;

        let system_prompt = request.persona.as_deref().and_then(|persona| {
            let prompt = self.personas.system_prompt(persona);
            if prompt.is_none() {
                warn!(persona, "unknown persona, continuing without a system prompt");
            }
            prompt
        });

        let prompt = match &self.grounding {
            Some(grounding) => match grounding.context_for(&request.topic).await {
                Some(context) => {
                    debug!(context_chars = context.len(), "grounding context attached");
                    format!("{context}\n\n{}", request.topic)
                }
                None => request.topic.clone(),
            },
            None => request.topic.clone(),
        };

        let dispatch_started = Instant::now();
        let dispatch = self.dispatcher.dispatch(&plan, &prompt, system_prompt.as_deref());
        let outcome = match request.deadline_secs.or(self.default_deadline_secs) {
            Some(secs) => timeout(Duration::from_secs(secs), dispatch)
                .await
                .map_err(|_| ResearchError::DeadlineExceeded {
                    phase: Phase::Dispatch,
                    topic: request.topic.clone(),
                    elapsed_ms: elapsed_ms(dispatch_started),
                })?,
            None => dispatch.await,
        };
        let dispatch_ms = elapsed_ms(dispatch_started);

        if outcome.responses.is_empty() {
            warn!(failures = outcome.failures.len(), "every backend call failed");
            return Err(ResearchError::ConsensusComputation {
                phase: Phase::Dispatch,
                topic: request.topic,
                cause: format!(
                    "no backend produced a response ({} slot failures)",
                    outcome.failures.len()
                ),
            });
        }

        let result = self.analyze_outcome(
            &request.topic,
            request.depth,
            outcome,
            plan.validate_outliers,
            started_at,
            dispatch_ms,
        )?;

        info!(
            id = %result.id,
            models = result.models_used.len(),
            confidence = result.confidence_score,
            cost_usd = result.cost.total_usd,
            "research complete"
        );
        self.hand_off(&result);
        Ok(result)
    }

    /// Run the analysis half over a frozen response set.
    pub fn analyze(
        &self,
        topic: &str,
        depth: ResearchDepth,
        responses: Vec<ModelResponse>,
    ) -> DomainResult<ResearchResult> {
        if responses.is_empty() {
            return Err(ResearchError::ConsensusComputation {
                phase: Phase::Consensus,
                topic: topic.to_string(),
                cause: "no responses supplied".to_string(),
            });
        }
        let outcome = DispatchOutcome {
            responses,
            failures: Vec::new(),
        };
        self.analyze_outcome(topic, depth, outcome, true, Utc::now(), 0)
    }

    fn analyze_outcome(
        &self,
        topic: &str,
        depth: ResearchDepth,
        outcome: DispatchOutcome,
        validate_outliers: bool,
        started_at: chrono::DateTime<Utc>,
        dispatch_ms: u64,
    ) -> DomainResult<ResearchResult> {
        let analysis_started = Instant::now();

        let outliers = if validate_outliers {
            self.outliers.isolate(outcome.responses.clone())
        } else {
            OutlierReport::passthrough(outcome.responses.clone(), true)
        };
        if outliers.valid.is_empty() {
            return Err(ResearchError::ConsensusComputation {
                phase: Phase::Outlier,
                topic: topic.to_string(),
                cause: "outlier isolation left no valid responses".to_string(),
            });
        }

        let consensus = self.consensus.calculate(topic, &outliers.valid)?;
        let variance = self.variance.analyze(&consensus, &outliers.valid);
        let derivatives = self.derivatives.derive(&consensus, &variance, &outliers.valid);

        let timing = Timing {
            started_at,
            completed_at: Utc::now(),
            dispatch_ms,
            analysis_ms: elapsed_ms(analysis_started),
        };

        Ok(self.assembler.assemble(AssemblyInput {
            topic: topic.to_string(),
            depth,
            responses: outcome.responses,
            failures: outcome.failures,
            outliers,
            consensus,
            variance,
            derivatives,
            timing,
        }))
    }

    /// Store the result in the background; failures are only logged.
    fn hand_off(&self, result: &ResearchResult) {
        let sink = Arc::clone(&self.sink);
        let result = result.clone();
        tokio::spawn(async move {
            if let Err(err) = sink.store(&result, None).await {
                warn!(id = %result.id, error = %err, "failed to store research result");
            }
        });
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
