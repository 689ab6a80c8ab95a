//! Common test utilities for integration tests
//!
//! Provides a scripted `ModelProvider` double and registry fixtures shared
//! across the integration test files.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use conclave::domain::models::{BackendCatalog, Config, ModelResponse};
use conclave::domain::ports::{GenerationOutput, GenerationRequest, ModelProvider, ProviderError};
use conclave::infrastructure::providers::{CallPolicy, ProviderRegistry, RetryPolicy};

/// One scripted reaction to a `generate` call.
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    Fail(ProviderError),
    Delay(Duration, String),
}

/// Provider that plays back a script; the last step repeats forever.
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
    available: bool,
}

impl ScriptedProvider {
    pub fn script(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            available: true,
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::script(vec![Step::Reply(text.to_string())])
    }

    pub fn failing(err: ProviderError) -> Arc<Self> {
        Self::script(vec![Step::Fail(err)])
    }

    pub fn delayed(delay: Duration, text: &str) -> Arc<Self> {
        Self::script(vec![Step::Delay(delay, text.to_string())])
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            available: false,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_step(&self) -> Option<Step> {
        let mut steps = self.steps.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(step) = steps.pop_front() {
            *last = Some(step);
        }
        last.clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let text = match self.next_step() {
            Some(Step::Reply(text)) => text,
            Some(Step::Fail(err)) => return Err(err),
            Some(Step::Delay(delay, text)) => {
                tokio::time::sleep(delay).await;
                text
            }
            None => return Err(ProviderError::Transport("script exhausted".into())),
        };

        Ok(GenerationOutput {
            text,
            input_tokens: 1000,
            output_tokens: 500,
            cost_estimate: None,
        })
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// Registry over the default catalog with the given providers registered.
pub fn registry(providers: &[(&str, Arc<ScriptedProvider>)]) -> Arc<ProviderRegistry> {
    let mut registry = ProviderRegistry::new(BackendCatalog::default());
    for (backend, provider) in providers {
        registry
            .register(*backend, Arc::clone(provider) as Arc<dyn ModelProvider>)
            .expect("backend is in the default catalog");
    }
    Arc::new(registry)
}

/// Short timeout, no retries.
pub fn fast_policy() -> CallPolicy {
    CallPolicy {
        timeout: Duration::from_secs(5),
        retry: RetryPolicy::none(),
    }
}

pub fn auth_error() -> ProviderError {
    ProviderError::Authentication("invalid api key".into())
}

pub fn test_config() -> Config {
    Config::default()
}

pub fn response(backend: &str, text: &str) -> ModelResponse {
    ModelResponse::new(backend, format!("{backend}-model"), text)
}
