//! Capability trait — the abstraction over agent tools.
//!
//! Capabilities are what give the agent the ability to act in the world:
//! query the knowledge base, search the web, read files, send notifications.
//! The reasoning loop only ever sees this trait; concrete implementations
//! live with their owning subsystems.

use crate::error::CapabilityError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// A declared parameter of a capability, rendered into the model prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,

    /// Value kind as shown to the model ("string", "number", "boolean", ...)
    pub kind: String,

    /// What the parameter means
    pub description: String,

    /// Whether the capability requires it
    pub required: bool,
}

impl ParamSpec {
    /// Create a required parameter.
    pub fn required(
        name: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            description: description.into(),
            required: true,
        }
    }

    /// Create an optional parameter.
    pub fn optional(
        name: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// The result of a capability invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityResult {
    /// Whether the invocation succeeded
    pub success: bool,

    /// The text output fed back to the model as an observation
    pub output: String,

    /// Optional structured payload (e.g. retrieved chunks as JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error description when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Capability-specific metadata (timings, provider info, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl CapabilityResult {
    /// A successful result with text output only.
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: None,
            error: None,
            metadata: Map::new(),
        }
    }

    /// A successful result carrying a structured payload.
    pub fn ok_with_data(output: impl Into<String>, data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::ok(output)
        }
    }

    /// A failed result.
    pub fn fail(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            output: String::new(),
            data: None,
            error: Some(error),
            metadata: Map::new(),
        }
    }
}

/// The core Capability trait.
///
/// Each capability (knowledge search, web search, file access, ...)
/// implements this trait and is registered in a [`CapabilityRegistry`].
/// `invoke` receives the parameter map parsed from the model's
/// `Action Input` block; enforcing required parameters is the capability's
/// own responsibility.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The unique name of this capability (e.g., "knowledge_search").
    fn name(&self) -> &str;

    /// A description of what this capability does (sent to the model).
    fn description(&self) -> &str;

    /// Declared parameters, rendered into the prompt listing.
    fn parameters(&self) -> Vec<ParamSpec>;

    /// Invoke the capability with the given parameters.
    async fn invoke(
        &self,
        params: Map<String, Value>,
    ) -> std::result::Result<CapabilityResult, CapabilityError>;
}

/// A registry of available capabilities.
///
/// The reasoning loop uses this to:
/// 1. Render the capability listing into the model prompt
/// 2. Look up and invoke capabilities when the model requests them
///
/// Registration order is preserved so the prompt listing is deterministic.
/// The registry is immutable once construction finishes and is safely
/// shared across concurrent runs behind an `Arc`.
pub struct CapabilityRegistry {
    capabilities: Vec<Box<dyn Capability>>,
    index: HashMap<String, usize>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a capability. Duplicate names are an error.
    pub fn register(
        &mut self,
        capability: Box<dyn Capability>,
    ) -> std::result::Result<(), CapabilityError> {
        let name = capability.name().to_string();
        if self.index.contains_key(&name) {
            return Err(CapabilityError::Duplicate(name));
        }
        debug!(capability = %name, "capability registered");
        self.index.insert(name, self.capabilities.len());
        self.capabilities.push(capability);
        Ok(())
    }

    /// Get a capability by name.
    pub fn get(&self, name: &str) -> Option<&dyn Capability> {
        self.index
            .get(name)
            .map(|&i| self.capabilities[i].as_ref())
    }

    /// All capability names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.capabilities.iter().map(|c| c.name()).collect()
    }

    /// Render the deterministic, registration-ordered listing used to build
    /// the model prompt:
    ///
    /// ```text
    /// - name: description
    ///   params: query: string - the search query, top_k: number - result count
    /// ```
    pub fn describe(&self) -> String {
        let mut lines = Vec::with_capacity(self.capabilities.len());
        for cap in &self.capabilities {
            let params = cap.parameters();
            let params_desc = if params.is_empty() {
                "none".to_string()
            } else {
                params
                    .iter()
                    .map(|p| format!("{}: {} - {}", p.name, p.kind, p.description))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            lines.push(format!(
                "- {}: {}\n  params: {}",
                cap.name(),
                cap.description(),
                params_desc
            ));
        }
        lines.join("\n")
    }

    /// Look up and invoke a capability in one step.
    pub async fn invoke(
        &self,
        name: &str,
        params: Map<String, Value>,
    ) -> std::result::Result<CapabilityResult, CapabilityError> {
        let capability = self
            .get(name)
            .ok_or_else(|| CapabilityError::NotFound(name.to_string()))?;
        capability.invoke(params).await
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test capability.
    struct EchoCapability;

    #[async_trait]
    impl Capability for EchoCapability {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters(&self) -> Vec<ParamSpec> {
            vec![ParamSpec::required("text", "string", "text to echo")]
        }
        async fn invoke(
            &self,
            params: Map<String, Value>,
        ) -> std::result::Result<CapabilityResult, CapabilityError> {
            let text = params
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Ok(CapabilityResult::ok(text))
        }
    }

    struct NoParamCapability;

    #[async_trait]
    impl Capability for NoParamCapability {
        fn name(&self) -> &str {
            "knowledge_stats"
        }
        fn description(&self) -> &str {
            "Reports knowledge base statistics"
        }
        fn parameters(&self) -> Vec<ParamSpec> {
            vec![]
        }
        async fn invoke(
            &self,
            _params: Map<String, Value>,
        ) -> std::result::Result<CapabilityResult, CapabilityError> {
            Ok(CapabilityResult::ok("3 documents"))
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Box::new(EchoCapability)).unwrap();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Box::new(EchoCapability)).unwrap();
        let err = registry.register(Box::new(EchoCapability)).unwrap_err();
        assert!(matches!(err, CapabilityError::Duplicate(name) if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn describe_preserves_registration_order() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Box::new(NoParamCapability)).unwrap();
        registry.register(Box::new(EchoCapability)).unwrap();

        let listing = registry.describe();
        let stats_pos = listing.find("knowledge_stats").unwrap();
        let echo_pos = listing.find("- echo:").unwrap();
        assert!(stats_pos < echo_pos);
        assert!(listing.contains("text: string - text to echo"));
        assert!(listing.contains("params: none"));
    }

    #[tokio::test]
    async fn invoke_dispatches_by_name() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Box::new(EchoCapability)).unwrap();

        let mut params = Map::new();
        params.insert("text".into(), Value::String("hello".into()));
        let result = registry.invoke("echo", params).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello");
    }

    #[tokio::test]
    async fn invoke_missing_capability() {
        let registry = CapabilityRegistry::new();
        let err = registry.invoke("nonexistent", Map::new()).await.unwrap_err();
        assert!(matches!(err, CapabilityError::NotFound(_)));
    }

    #[test]
    fn result_constructors() {
        let ok = CapabilityResult::ok_with_data("found", serde_json::json!({"count": 2}));
        assert!(ok.success);
        assert!(ok.data.is_some());

        let fail = CapabilityResult::fail("index unavailable");
        assert!(!fail.success);
        assert_eq!(fail.error.as_deref(), Some("index unavailable"));
    }
}
