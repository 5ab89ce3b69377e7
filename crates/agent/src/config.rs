//! Run configuration.

/// Configuration for one reasoning run. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum reasoning iterations before the run soft-fails.
    pub max_iterations: usize,

    /// Sampling temperature passed through to the model backend.
    pub temperature: f32,

    /// Run the reflection critic over the final answer.
    pub enable_reflection: bool,

    /// Allow planner usage by callers that want an upfront plan.
    pub enable_planning: bool,

    /// Emit more detailed tracing during the run.
    pub verbose: bool,

    /// Advisory model-call timeout. Not enforced by the orchestrator;
    /// ModelClient implementations own their own deadlines.
    pub model_timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            temperature: 0.7,
            enable_reflection: false,
            enable_planning: true,
            verbose: false,
            model_timeout_secs: 30,
        }
    }
}

impl RunConfig {
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_reflection(mut self, enabled: bool) -> Self {
        self.enable_reflection = enabled;
        self
    }

    pub fn with_planning(mut self, enabled: bool) -> Self {
        self.enable_planning = enabled;
        self
    }

    pub fn with_verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }
}
