use serde::{Deserialize, Serialize};

/// Urgency bucket driving the scheduler's `suggested_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// The five weighted inputs to the decision engine's base score, each in
/// `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DecisionFactors {
    pub emotion: f64,
    pub topic: f64,
    pub timing: f64,
    pub importance: f64,
    pub keyword: f64,
}

/// The decision engine's verdict for one triggering turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub should_comment: bool,
    pub score: f64,
    pub confidence: f64,
    pub factors: DecisionFactors,
    pub priority: Priority,
    pub suggested_delay_ms: u64,
    pub reasoning: String,
}
