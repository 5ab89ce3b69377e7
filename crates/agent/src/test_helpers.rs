//! Shared test helpers: scripted mock models and capabilities.

use async_trait::async_trait;
use ragmind_core::{
    Capability, CapabilityError, CapabilityRegistry, CapabilityResult, FragmentReceiver,
    ModelClient, ModelError, ParamSpec,
};
use serde_json::{Map, Value};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One scripted model response: text or a failure.
pub(crate) enum MockOutcome {
    Text(String),
    Error(String),
}

impl MockOutcome {
    pub(crate) fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    pub(crate) fn error(message: &str) -> Self {
        Self::Error(message.to_string())
    }
}

/// A mock model that returns a sequence of scripted responses.
///
/// Each call to `complete` consumes the next outcome and records the
/// prompt it was given. Panics if more calls are made than outcomes
/// provided.
pub(crate) struct SequentialMockModel {
    outcomes: Mutex<Vec<MockOutcome>>,
    prompts: Mutex<Vec<String>>,
    calls: Mutex<usize>,
}

impl SequentialMockModel {
    pub(crate) fn with_outcomes(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            prompts: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
        }
    }

    pub(crate) fn new(texts: Vec<String>) -> Self {
        Self::with_outcomes(texts.into_iter().map(MockOutcome::Text).collect())
    }

    /// A model that returns a single text response.
    pub(crate) fn single(text: &str) -> Self {
        Self::new(vec![text.to_string()])
    }

    /// The prompt received by call `index`.
    pub(crate) fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ModelClient for SequentialMockModel {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let mut calls = self.calls.lock().unwrap();
        let outcomes = self.outcomes.lock().unwrap();

        if *calls >= outcomes.len() {
            panic!(
                "SequentialMockModel: no more responses (call #{}, have {})",
                *calls,
                outcomes.len()
            );
        }

        self.prompts.lock().unwrap().push(prompt.to_string());
        let outcome = &outcomes[*calls];
        *calls += 1;

        match outcome {
            MockOutcome::Text(text) => Ok(text.clone()),
            MockOutcome::Error(message) => Err(ModelError::Network(message.clone())),
        }
    }
}

/// A model whose every call fails.
pub(crate) struct FailingModel;

#[async_trait]
impl ModelClient for FailingModel {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        Err(ModelError::Network("mock backend unreachable".into()))
    }
}

/// A mock model with scripted *fragment* sequences for streaming calls
/// and, optionally, scripted plain completions (for critic calls made
/// during a streaming run).
pub(crate) struct ScriptedStreamModel {
    scripts: Mutex<Vec<Vec<String>>>,
    stream_calls: Mutex<usize>,
    completions: Mutex<Vec<String>>,
}

impl ScriptedStreamModel {
    pub(crate) fn new(scripts: Vec<Vec<String>>) -> Self {
        Self::with_completions(scripts, Vec::new())
    }

    pub(crate) fn with_completions(scripts: Vec<Vec<String>>, completions: Vec<String>) -> Self {
        Self {
            scripts: Mutex::new(scripts),
            stream_calls: Mutex::new(0),
            completions: Mutex::new(completions),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedStreamModel {
    fn name(&self) -> &str {
        "scripted_stream_mock"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        let mut completions = self.completions.lock().unwrap();
        if completions.is_empty() {
            panic!("ScriptedStreamModel: unexpected complete() call");
        }
        Ok(completions.remove(0))
    }

    async fn stream_completion(&self, _prompt: &str) -> Result<FragmentReceiver, ModelError> {
        let fragments = {
            let scripts = self.scripts.lock().unwrap();
            let mut calls = self.stream_calls.lock().unwrap();
            if *calls >= scripts.len() {
                panic!(
                    "ScriptedStreamModel: no more fragment scripts (call #{}, have {})",
                    *calls,
                    scripts.len()
                );
            }
            let fragments = scripts[*calls].clone();
            *calls += 1;
            fragments
        };

        let (tx, rx) = mpsc::channel(fragments.len().max(1));
        for fragment in fragments {
            let _ = tx.send(Ok(fragment)).await;
        }
        Ok(rx)
    }
}

/// A capability that always succeeds with a fixed output.
pub(crate) struct StaticCapability {
    name: String,
    output: String,
    data: Option<Value>,
}

impl StaticCapability {
    pub(crate) fn new(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            data: None,
        }
    }

    pub(crate) fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[async_trait]
impl Capability for StaticCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Returns a fixed result"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("query", "string", "the query")]
    }

    async fn invoke(&self, _params: Map<String, Value>) -> Result<CapabilityResult, CapabilityError> {
        Ok(match &self.data {
            Some(data) => CapabilityResult::ok_with_data(self.output.clone(), data.clone()),
            None => CapabilityResult::ok(self.output.clone()),
        })
    }
}

/// A capability whose invocation always errors.
pub(crate) struct FailingCapability {
    name: String,
    reason: String,
}

impl FailingCapability {
    pub(crate) fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Capability for FailingCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![]
    }

    async fn invoke(&self, _params: Map<String, Value>) -> Result<CapabilityResult, CapabilityError> {
        Err(CapabilityError::ExecutionFailed {
            capability: self.name.clone(),
            reason: self.reason.clone(),
        })
    }
}

/// Build a registry from the given capabilities.
pub(crate) fn registry_with(capabilities: Vec<Box<dyn Capability>>) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    for capability in capabilities {
        registry.register(capability).unwrap();
    }
    registry
}
