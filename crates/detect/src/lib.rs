//! Event detection adapter (§4.4, C4).
//!
//! Delegates to an external LLM via a [`commentator_llm::LlmProvider`],
//! builds the detection prompt, parses the strict-JSON response, and
//! applies the per-event-type confidence/intensity filters before
//! returning enriched [`Event`]s.

mod filter;
mod prompt;

pub use filter::passes_filter;
pub use prompt::build_prompt;

use commentator_llm::{CompletionRequest, LlmError, LlmProvider};
use commentator_types::{DetectionJob, Event, EventMetadata, EventType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Configuration for the event detector, mirroring §6's `eventDetector`
/// group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetectorConfig {
    pub detection_sensitivity: f64,
    pub emotion_threshold: f64,
    pub topic_transition_threshold: f64,
    pub keypoint_density_threshold: f64,
    pub model_provider: commentator_llm::ModelProvider,
    pub model: String,
}

impl Default for EventDetectorConfig {
    fn default() -> Self {
        Self {
            detection_sensitivity: 0.70,
            emotion_threshold: 0.75,
            topic_transition_threshold: 0.30,
            keypoint_density_threshold: 0.50,
            model_provider: commentator_llm::ModelProvider::Openai,
            model: "gpt-5-nano".to_string(),
        }
    }
}

impl EventDetectorConfig {
    pub fn validate(&self) -> Result<(), DetectConfigError> {
        for (name, value) in [
            ("detection_sensitivity", self.detection_sensitivity),
            ("emotion_threshold", self.emotion_threshold),
            ("topic_transition_threshold", self.topic_transition_threshold),
            ("keypoint_density_threshold", self.keypoint_density_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DetectConfigError::OutOfRange { field: name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DetectConfigError {
    #[error("event detector config field `{field}` out of [0,1] range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("malformed detector response: {0}")]
    Parse(#[from] serde_json::Error),
    /// Defensive re-check, mirroring the queue's own dequeue-time
    /// staleness gate (§5: "for defensive symmetry"). A caller that
    /// performs this second check before invoking the detector should
    /// surface it as this variant rather than a transport/parse error.
    #[error("job stale at detection time")]
    Stale,
}

/// The strict-JSON contract requested from the LLM (§4.4 step 2).
#[derive(Debug, Deserialize)]
struct RawDetectionResponse {
    events: Vec<RawEvent>,
    #[allow(dead_code)]
    context_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: EventType,
    confidence: f64,
    intensity: f64,
    #[serde(default)]
    triggers: Vec<String>,
    #[serde(default)]
    reasoning: String,
    content_quality_score: f64,
}

/// Calls the configured LLM provider, parses its response, and filters
/// events by the per-type thresholds in §4.4 step 3.
pub struct EventDetector {
    provider: Arc<dyn LlmProvider>,
    config: EventDetectorConfig,
}

impl EventDetector {
    pub fn new(provider: Arc<dyn LlmProvider>, config: EventDetectorConfig) -> Self {
        Self { provider, config }
    }

    pub async fn detect(&self, job: &DetectionJob, cancel: Option<CancellationToken>) -> Result<Vec<Event>, DetectionError> {
        let (system_prompt, user_prompt) = build_prompt(&job.uncommented_text, &job.full_context, &job.turn.content);
        let request = CompletionRequest {
            model: self.config.model.clone(),
            system_prompt,
            user_prompt,
        };

        tracing::debug!(turn_id = %job.turn.id, provider = self.provider.name(), "detector: calling LLM");
        let raw_text = self.provider.complete_json(request, cancel).await?;
        let parsed: RawDetectionResponse = serde_json::from_str(&raw_text)?;

        let events = parsed
            .events
            .into_iter()
            .filter(|raw| passes_filter(raw.event_type, raw.confidence, raw.intensity, &self.config))
            .map(|raw| {
                Event::new(
                    uuid::Uuid::new_v4().to_string(),
                    raw.event_type,
                    raw.confidence,
                    raw.intensity,
                    job.turn.end_time,
                    raw.triggers,
                    EventMetadata {
                        reasoning: raw.reasoning,
                        language: parsed.context_language.clone(),
                        content_quality_score: raw.content_quality_score,
                    },
                )
            })
            .collect::<Vec<_>>();

        tracing::debug!(turn_id = %job.turn.id, event_count = events.len(), "detector: events after filtering");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubProvider {
        response: String,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn complete_json(
            &self,
            _request: CompletionRequest,
            _cancel: Option<CancellationToken>,
        ) -> Result<String, LlmError> {
            Ok(self.response.clone())
        }
    }

    fn job() -> DetectionJob {
        DetectionJob::new(
            commentator_types::Turn::new("a", "hello everyone", 0.0, 3.0),
            "earlier context".into(),
            "full conversation so far".into(),
            0,
        )
    }

    #[tokio::test]
    async fn filters_low_confidence_events_property() {
        let response = serde_json::json!({
            "events": [
                {"type": "key_point", "confidence": 0.2, "intensity": 0.9, "triggers": [], "reasoning": "r", "content_quality_score": 8},
                {"type": "key_point", "confidence": 0.1, "intensity": 0.9, "triggers": [], "reasoning": "r", "content_quality_score": 8}
            ],
            "context_language": "en"
        })
        .to_string();
        let detector = EventDetector::new(Arc::new(StubProvider { response }), EventDetectorConfig::default());
        let events = detector.detect(&job(), None).await.unwrap();
        assert!(events.is_empty(), "all confidences below detectionSensitivity must yield zero events");
    }

    #[tokio::test]
    async fn enriches_passing_events_with_fresh_id_and_turn_timestamp() {
        let response = serde_json::json!({
            "events": [
                {"type": "key_point", "confidence": 0.95, "intensity": 0.9, "triggers": ["t1"], "reasoning": "good point", "content_quality_score": 8}
            ],
            "context_language": "en"
        })
        .to_string();
        let detector = EventDetector::new(Arc::new(StubProvider { response }), EventDetectorConfig::default());
        let events = detector.detect(&job(), None).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, 3.0);
        assert_eq!(events[0].duration, 0.0);
        assert!(!events[0].id.is_empty());
        assert_eq!(events[0].metadata.reasoning, "good point");
    }

    #[tokio::test]
    async fn malformed_json_surfaces_as_parse_error() {
        let detector = EventDetector::new(
            Arc::new(StubProvider { response: "not json".into() }),
            EventDetectorConfig::default(),
        );
        let err = detector.detect(&job(), None).await.unwrap_err();
        assert!(matches!(err, DetectionError::Parse(_)));
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut config = EventDetectorConfig::default();
        config.emotion_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
