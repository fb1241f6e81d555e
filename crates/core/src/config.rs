use commentator_aggregator::AggregatorConfig;
use commentator_buffer::BufferConfig;
use commentator_decision::DecisionEngineConfig;
use commentator_detect::EventDetectorConfig;
use commentator_scheduler::CommentGeneratorConfig;
use serde::{Deserialize, Serialize};

/// Top-level, facade-wide configuration (§6's configuration surface).
/// Every group has its own `Default` and its own `validate()`; this
/// struct's `validate()` just runs each and reports the first failure,
/// so `Commentator::create` fails fast on an invalid config rather than
/// silently clamping anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub context_buffer: BufferConfig,
    #[serde(default = "uncommented_buffer_default")]
    pub uncommented_buffer: BufferConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub detector: EventDetectorConfig,
    #[serde(default)]
    pub decision: DecisionEngineConfig,
    #[serde(default)]
    pub generator: CommentGeneratorConfig,
}

fn uncommented_buffer_default() -> BufferConfig {
    BufferConfig::uncommented_default()
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.context_buffer.validate()?;
        self.uncommented_buffer.validate()?;
        self.aggregator.validate()?;
        self.detector.validate()?;
        self.decision.validate()?;
        self.generator.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("context/uncommented buffer config: {0}")]
    Buffer(#[from] commentator_buffer::BufferConfigError),
    #[error("aggregator config: {0}")]
    Aggregator(#[from] commentator_aggregator::AggregatorConfigError),
    #[error("event detector config: {0}")]
    Detector(#[from] commentator_detect::DetectConfigError),
    #[error("decision engine config: {0}")]
    Decision(#[from] commentator_decision::DecisionConfigError),
    #[error("comment generator config: {0}")]
    Generator(#[from] commentator_scheduler::WriterConfigError),
}
