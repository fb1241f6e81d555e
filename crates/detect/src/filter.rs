use crate::EventDetectorConfig;
use commentator_types::EventType;

/// Per-event filter predicate (§4.4 step 3). All applicable clauses must
/// pass; `TopicChange` is subject to both the emotion and topic-transition
/// intensity floors since it appears in both type sets.
pub fn passes_filter(event_type: EventType, confidence: f64, intensity: f64, config: &EventDetectorConfig) -> bool {
    if confidence < config.detection_sensitivity {
        return false;
    }
    if matches!(event_type, EventType::EmotionPeak | EventType::TopicChange) && intensity < config.emotion_threshold {
        return false;
    }
    if matches!(
        event_type,
        EventType::TopicChange | EventType::QuestionRaised | EventType::ConclusionReached | EventType::SummaryPoint
    ) && intensity < config.topic_transition_threshold
    {
        return false;
    }
    if matches!(event_type, EventType::KeyPoint) && intensity < config.keypoint_density_threshold {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EventDetectorConfig {
        EventDetectorConfig::default()
    }

    #[test]
    fn low_confidence_always_rejected() {
        assert!(!passes_filter(EventType::KeyPoint, 0.5, 1.0, &config()));
    }

    #[test]
    fn emotion_peak_needs_emotion_threshold() {
        let c = config();
        assert!(!passes_filter(EventType::EmotionPeak, 0.9, c.emotion_threshold - 0.01, &c));
        assert!(passes_filter(EventType::EmotionPeak, 0.9, c.emotion_threshold, &c));
    }

    #[test]
    fn topic_change_needs_both_floors() {
        let c = config();
        // Passes emotion floor but fails topic-transition floor is impossible here
        // since topic_transition_threshold (0.30) < emotion_threshold (0.75);
        // verify the binding constraint is the higher one.
        assert!(!passes_filter(EventType::TopicChange, 0.9, 0.5, &c));
        assert!(passes_filter(EventType::TopicChange, 0.9, c.emotion_threshold, &c));
    }

    #[test]
    fn key_point_uses_keypoint_density_threshold() {
        let c = config();
        assert!(!passes_filter(EventType::KeyPoint, 0.9, c.keypoint_density_threshold - 0.01, &c));
        assert!(passes_filter(EventType::KeyPoint, 0.9, c.keypoint_density_threshold, &c));
    }

    #[test]
    fn climax_moment_has_no_intensity_floor() {
        let c = config();
        assert!(passes_filter(EventType::ClimaxMoment, c.detection_sensitivity, 0.0, &c));
    }
}
