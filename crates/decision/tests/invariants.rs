//! Property tests for two of §8's invariants that, unlike the queue's
//! latest-wins and the scheduler's supersede invariant, were previously
//! only exercised by `#[cfg(test)]` unit tests inside `src/lib.rs`:
//!
//! - `lastCommentTime` is non-decreasing across emissions, for any turn
//!   sequence.
//! - `dynamicThreshold` always stays within `[0.30, 0.95]`.
//!
//! Both are driven here by an arbitrary-length sequence of strictly
//! increasing media timestamps and random-ish confidences/qualities,
//! feeding every positive decision back into `update_history` the same
//! way the facade's scheduler-output listener does.

use commentator_decision::{DecisionEngine, DecisionEngineConfig};
use commentator_types::{Comment, CommentMetadata, Event, EventMetadata, EventType};

fn event(confidence: f64, quality: f64, timestamp: f64) -> Event {
    Event::new(
        "e",
        EventType::KeyPoint,
        confidence,
        confidence,
        timestamp,
        vec![],
        EventMetadata {
            reasoning: String::new(),
            language: None,
            content_quality_score: quality,
        },
    )
}

fn comment_at(timestamp: f64) -> Comment {
    Comment {
        id: "c".into(),
        content: "x".into(),
        writer: "w".into(),
        length: 1,
        generation_time_ms: 0,
        metadata: CommentMetadata { timestamp },
    }
}

proptest::proptest! {
    #[test]
    fn last_comment_time_is_non_decreasing_across_emissions(
        gaps in proptest::collection::vec(0.5f64..40.0, 1..60),
        confidences in proptest::collection::vec(0.0f64..1.0, 1..60),
        qualities in proptest::collection::vec(0.0f64..10.0, 1..60),
    ) {
        let mut engine = DecisionEngine::new(DecisionEngineConfig::default());
        let mut timestamp = 0.0f64;
        let mut last_seen: Option<f64> = None;
        let n = gaps.len().min(confidences.len()).min(qualities.len());

        for i in 0..n {
            timestamp += gaps[i];
            let events = vec![event(confidences[i], qualities[i], timestamp)];
            let decision = engine.evaluate(&events, timestamp);

            if decision.should_comment {
                engine.update_history(comment_at(timestamp));
            }

            if let Some(prev) = engine.last_comment_time() {
                if let Some(before) = last_seen {
                    proptest::prop_assert!(prev >= before, "last_comment_time must never decrease");
                }
                last_seen = Some(prev);
            }

            proptest::prop_assert!(
                engine.dynamic_threshold() >= 0.30 && engine.dynamic_threshold() <= 0.95,
                "dynamic_threshold escaped [0.30, 0.95]: {}",
                engine.dynamic_threshold()
            );
        }
    }

    #[test]
    fn dynamic_threshold_stays_in_bounds_for_any_base_threshold(
        base_threshold in 0.0f64..1.0,
        confidences in proptest::collection::vec(0.0f64..1.0, 1..40),
    ) {
        let config = DecisionEngineConfig {
            base_threshold,
            ..DecisionEngineConfig::default()
        };
        let mut engine = DecisionEngine::new(config);
        proptest::prop_assert!(engine.dynamic_threshold() >= 0.30 && engine.dynamic_threshold() <= 0.95);

        let mut timestamp = 0.0f64;
        for confidence in confidences {
            timestamp += 10.0;
            let events = vec![event(confidence, 5.0, timestamp)];
            let decision = engine.evaluate(&events, timestamp);
            if decision.should_comment {
                engine.update_history(comment_at(timestamp));
            }
            proptest::prop_assert!(engine.dynamic_threshold() >= 0.30 && engine.dynamic_threshold() <= 0.95);
        }
    }
}
