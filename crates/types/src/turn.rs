use serde::{Deserialize, Serialize};

/// A bounded transcription fragment with media-relative start/end seconds.
///
/// Turns are immutable once constructed; `startTime`/`endTime` are
/// monotonic per stream and `end_time >= start_time` always holds for
/// turns produced by this system (callers that hand-construct a `Turn`
/// with `end_time < start_time` get a turn with zero or negative
/// duration downstream, which callers should treat as malformed input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub content: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl Turn {
    pub fn new(id: impl Into<String>, content: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            start_time,
            end_time,
        }
    }

    /// Duration in seconds. Never negative for well-formed turns.
    pub fn duration_seconds(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_seconds() * 1000.0
    }
}
