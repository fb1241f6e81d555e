use serde::{Deserialize, Serialize};

/// The closed set of conversational events the detector can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    EmotionPeak,
    TopicChange,
    QuestionRaised,
    ConclusionReached,
    KeyPoint,
    ClimaxMoment,
    SummaryPoint,
}

/// Free-form provenance captured alongside a detected event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMetadata {
    pub reasoning: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Raw quality score in `[0, 10]` as reported by the detector, prior to
    /// the decision engine's `[0, 0.3]` bonus normalization.
    pub content_quality_score: f64,
}

/// A typed observation about the conversation, enriched by the detector
/// adapter (§4.4) from a raw LLM response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub confidence: f64,
    pub intensity: f64,
    pub timestamp: f64,
    pub duration: f64,
    pub triggers: Vec<String>,
    pub metadata: EventMetadata,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        event_type: EventType,
        confidence: f64,
        intensity: f64,
        timestamp: f64,
        triggers: Vec<String>,
        metadata: EventMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            event_type,
            confidence: confidence.clamp(0.0, 1.0),
            intensity: intensity.clamp(0.0, 1.0),
            timestamp,
            duration: 0.0,
            triggers,
            metadata,
        }
    }
}
