//! Decision engine (§4.5, C5) — the scoring core.
//!
//! Stateful per stream: weighted factor scoring, a content-quality bonus,
//! multiplicative time-decay and frequency-suppression modifiers, a
//! priority/delay calculation, and a dynamic threshold that self-adjusts
//! toward baseline based on recent commenting rate. Pure computation —
//! `evaluate` never fails and never returns `Result`.
//!
//! Two historical time-unit bugs are corrected here: the
//! frequency-suppression window is `90` media-seconds (not `90_000`),
//! and [`DecisionEngine::update_history`] requires a media-time
//! `timestamp` on every `Comment` rather than falling back to
//! wall-clock time, since `CommentMetadata.timestamp` is a mandatory
//! `f64` in `commentator-types`.

use commentator_types::{Comment, Decision, DecisionFactors, Event, EventType, Priority};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How many most-recent comments to retain for frequency suppression
/// (§3's `commentHistory` invariant).
const HISTORY_CAPACITY: usize = 10;

/// Media-second window, per §9's fix, for counting recent comments in
/// the frequency-suppression modifier.
const FREQUENCY_WINDOW_SECS: f64 = 90.0;

/// Configuration for the decision engine, mirroring §6's `decisionEngine`
/// group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEngineConfig {
    pub base_threshold: f64,
    pub min_interval_secs: f64,
    pub max_interval_secs: f64,
    pub emotion_weight: f64,
    pub topic_weight: f64,
    pub timing_weight: f64,
    pub importance_weight: f64,
    pub keyword_weight: f64,
    /// Carried for schema parity with §6 (default `0.80`); §4.5's
    /// frequency-suppression algorithm is defined via a fixed
    /// comment-count bucket table, not this config value, so it is
    /// validated but intentionally unused by `evaluate()` — matching an
    /// inconsistency already present in the distilled spec rather than
    /// inventing a use for it.
    pub frequency_suppression: f64,
    pub time_decay_rate: f64,
}

impl Default for DecisionEngineConfig {
    fn default() -> Self {
        Self {
            base_threshold: 0.65,
            min_interval_secs: 20.0,
            max_interval_secs: 90.0,
            emotion_weight: 0.20,
            topic_weight: 0.40,
            timing_weight: 0.15,
            importance_weight: 0.60,
            keyword_weight: 0.30,
            frequency_suppression: 0.80,
            time_decay_rate: 0.95,
        }
    }
}

impl DecisionEngineConfig {
    pub fn validate(&self) -> Result<(), DecisionConfigError> {
        for (name, value) in [
            ("emotion_weight", self.emotion_weight),
            ("topic_weight", self.topic_weight),
            ("timing_weight", self.timing_weight),
            ("importance_weight", self.importance_weight),
            ("keyword_weight", self.keyword_weight),
            ("frequency_suppression", self.frequency_suppression),
            ("time_decay_rate", self.time_decay_rate),
            ("base_threshold", self.base_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DecisionConfigError::OutOfRange { field: name, value });
            }
        }
        if self.min_interval_secs < 0.0 || self.max_interval_secs < 0.0 {
            return Err(DecisionConfigError::OutOfRange {
                field: "min_interval_secs/max_interval_secs",
                value: self.min_interval_secs.min(self.max_interval_secs),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DecisionConfigError {
    #[error("decision engine config field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Stateful scoring engine, one instance per stream.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: DecisionEngineConfig,
    last_comment_time: Option<f64>,
    comment_history: VecDeque<Comment>,
    dynamic_threshold: f64,
}

impl DecisionEngine {
    pub fn new(config: DecisionEngineConfig) -> Self {
        let dynamic_threshold = (config.base_threshold * 1.3).min(0.85);
        Self {
            config,
            last_comment_time: None,
            comment_history: VecDeque::new(),
            dynamic_threshold,
        }
    }

    pub fn dynamic_threshold(&self) -> f64 {
        self.dynamic_threshold
    }

    pub fn last_comment_time(&self) -> Option<f64> {
        self.last_comment_time
    }

    pub fn history(&self) -> impl Iterator<Item = &Comment> {
        self.comment_history.iter()
    }

    /// Media-seconds elapsed since the last comment, `0` when there is no
    /// prior comment (`lastCommentTime = -inf` per §4.5).
    fn delta(&self, timestamp: f64) -> f64 {
        match self.last_comment_time {
            Some(t) => (timestamp - t).max(0.0),
            None => 0.0,
        }
    }

    fn timing_factor(&self, timestamp: f64) -> f64 {
        if timestamp < 20.0 {
            return 0.1;
        }
        let delta = self.delta(timestamp);
        let min = self.config.min_interval_secs;
        let max = self.config.max_interval_secs;
        if delta < min {
            (delta / min * 0.2).max(0.05)
        } else if delta > max {
            1.0
        } else {
            (delta - min) / (max - min)
        }
    }

    fn max_confidence(events: &[Event], predicate: impl Fn(EventType) -> bool) -> f64 {
        events
            .iter()
            .filter(|e| predicate(e.event_type))
            .map(|e| e.confidence)
            .fold(0.0_f64, f64::max)
    }

    fn compute_factors(&self, events: &[Event], timestamp: f64) -> DecisionFactors {
        DecisionFactors {
            emotion: Self::max_confidence(events, |t| t == EventType::EmotionPeak),
            topic: Self::max_confidence(events, |t| t == EventType::TopicChange),
            timing: self.timing_factor(timestamp),
            importance: Self::max_confidence(events, |t| {
                matches!(t, EventType::ConclusionReached | EventType::KeyPoint | EventType::SummaryPoint)
            }),
            keyword: Self::max_confidence(events, |t| t == EventType::QuestionRaised),
        }
    }

    fn quality_bonus(events: &[Event]) -> f64 {
        let total: f64 = events
            .iter()
            .map(|e| ((e.metadata.content_quality_score - 3.0) / 10.0 * 0.3).max(0.0))
            .sum();
        total.min(0.3)
    }

    fn frequency_suppression(&self, timestamp: f64) -> f64 {
        let window_start = timestamp - FREQUENCY_WINDOW_SECS;
        let count = self
            .comment_history
            .iter()
            .filter(|c| c.metadata.timestamp >= window_start && c.metadata.timestamp < timestamp)
            .count();
        match count {
            0 => 1.0,
            1 => 0.6,
            2 => 0.4,
            _ => 0.2,
        }
    }

    /// Scores `events` detected for a turn ending at media-time
    /// `timestamp`, producing a `Decision` and advancing the dynamic
    /// threshold. Does not touch `last_comment_time` or
    /// `comment_history` — those are only updated via
    /// [`Self::update_history`] once a comment is actually accepted.
    pub fn evaluate(&mut self, events: &[Event], timestamp: f64) -> Decision {
        let factors = self.compute_factors(events, timestamp);
        let delta = self.delta(timestamp);
        let quality_bonus = Self::quality_bonus(events);

        let base = factors.emotion * self.config.emotion_weight
            + factors.topic * self.config.topic_weight
            + factors.timing * self.config.timing_weight
            + factors.importance * self.config.importance_weight
            + factors.keyword * self.config.keyword_weight;

        let time_decay = self.config.time_decay_rate.powf((60.0 - delta).max(0.0) / 60.0);
        let frequency_suppression = self.frequency_suppression(timestamp);
        let final_score = (base + quality_bonus) * time_decay * frequency_suppression;

        let has_climactic_event = events
            .iter()
            .any(|e| matches!(e.event_type, EventType::ConclusionReached | EventType::ClimaxMoment));
        let priority = if has_climactic_event && final_score > 0.95 {
            Priority::High
        } else if final_score > 0.85 {
            Priority::Medium
        } else {
            Priority::Low
        };

        let should_comment = final_score > self.dynamic_threshold;
        let confidence = (final_score / self.dynamic_threshold).min(1.0);

        let mut suggested_delay_ms: u64 = match priority {
            Priority::High => 1500,
            Priority::Medium => 2500,
            Priority::Low => 4000,
        };
        if delta < self.config.min_interval_secs {
            suggested_delay_ms += ((self.config.min_interval_secs - delta) * 1000.0) as u64;
        }

        let reasoning = format!(
            "final={final_score:.4} {} dynamic_threshold={:.4} (base={base:.4} quality_bonus={quality_bonus:.4} \
             time_decay={time_decay:.4} freq_suppression={frequency_suppression:.4} delta={delta:.1}s)",
            if should_comment { "exceeds" } else { "below" },
            self.dynamic_threshold,
        );

        if should_comment && delta < 1.5 * self.config.min_interval_secs {
            self.dynamic_threshold = (self.dynamic_threshold * 1.05).min(0.95);
        } else if !should_comment && delta > self.config.max_interval_secs {
            self.dynamic_threshold = (self.dynamic_threshold * 0.95).max(0.30);
        } else {
            self.dynamic_threshold += 0.1 * (self.config.base_threshold - self.dynamic_threshold);
        }

        tracing::debug!(?factors, final_score, should_comment, dynamic_threshold = self.dynamic_threshold, "decision computed");
        if should_comment {
            tracing::info!(final_score, priority = ?priority, "decision: should comment");
        }

        Decision {
            should_comment,
            score: final_score,
            confidence,
            factors,
            priority,
            suggested_delay_ms,
            reasoning,
        }
    }

    /// Records an accepted comment: appends to history, advances
    /// `last_comment_time` to the comment's media timestamp, and trims
    /// history to the 10 most recent (oldest-first).
    pub fn update_history(&mut self, comment: Comment) {
        self.last_comment_time = Some(comment.metadata.timestamp);
        self.comment_history.push_back(comment);
        while self.comment_history.len() > HISTORY_CAPACITY {
            self.comment_history.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.last_comment_time = None;
        self.comment_history.clear();
        self.dynamic_threshold = (self.config.base_threshold * 1.3).min(0.85);
    }
}
