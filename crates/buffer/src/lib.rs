//! Time-indexed text buffer (§4.1, C1).
//!
//! Two buffers are instantiated by the facade: a long-retention "context"
//! buffer and an "uncommented" buffer that the scheduler clears after every
//! accepted comment. Both are the same type, differing only in config.
//!
//! All operations here are synchronous and infallible — this is a pure
//! in-memory store, never touched from more than one task at a time per
//! the single-writer discipline in §5.

use commentator_types::Turn;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Configuration for one `TextBuffer` instance, mirroring the
/// `contextBuffer`/`uncommentedBuffer` schema in §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Soft cap on total words retained, in words. Not currently enforced
    /// as a hard eviction rule (see `retention_time_secs`); carried for
    /// schema parity with §6.
    pub buffer_size_words: u64,
    /// Default window size in seconds for `get_window` when called with
    /// `None`.
    pub window_duration_secs: f64,
    /// Soft cap on one segment's word count. Not enforced as a splitting
    /// rule — only its existence is documented, not split semantics.
    pub segment_max_size_words: u64,
    /// How long, in seconds, a segment is considered retrievable at all.
    /// No automatic eviction runs; this bounds `get_window`'s widest
    /// caller-supplied window, not a background sweep.
    pub retention_time_secs: f64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            buffer_size_words: 10_000,
            window_duration_secs: 300.0,
            segment_max_size_words: 50,
            retention_time_secs: 3600.0,
        }
    }
}

/// Config for the uncommented buffer inherits the context buffer's schema
/// but is, by default, unbounded in retention since it is cleared on every
/// emit rather than aged out.
impl BufferConfig {
    pub fn uncommented_default() -> Self {
        Self::default()
    }

    /// Validates range constraints from §6 (`all fields >= 0`). All our
    /// fields are already non-negative by type (`u64`) except the two
    /// `f64` seconds fields, which can arrive as negative or non-finite
    /// values from deserialized config.
    pub fn validate(&self) -> Result<(), BufferConfigError> {
        if !self.window_duration_secs.is_finite() || self.window_duration_secs < 0.0 {
            return Err(BufferConfigError::OutOfRange {
                field: "window_duration_secs",
                value: self.window_duration_secs,
            });
        }
        if !self.retention_time_secs.is_finite() || self.retention_time_secs < 0.0 {
            return Err(BufferConfigError::OutOfRange {
                field: "retention_time_secs",
                value: self.retention_time_secs,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BufferConfigError {
    #[error("buffer config field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// One appended fragment of text, keyed by media time and arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSegment {
    pub content: String,
    pub timestamp: f64,
    pub position: u64,
}

/// A point-in-time snapshot of buffer occupancy, suitable for the
/// facade's `get_statistics()` surface (§2a's observability surface).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BufferStatistics {
    pub segment_count: usize,
    pub total_chars: usize,
    pub oldest_timestamp: Option<f64>,
    pub newest_timestamp: Option<f64>,
}

/// Ordered, append-only store of `TextSegment`s. `clear()` is the only
/// bulk-mutating operation; otherwise segments accumulate in arrival
/// order for the buffer's lifetime.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    config: BufferConfig,
    segments: Vec<TextSegment>,
    next_position: u64,
}

impl TextBuffer {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            config,
            segments: Vec::new(),
            next_position: 0,
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Appends the turn's content as a new segment keyed by `end_time`.
    pub fn append(&mut self, turn: &Turn) {
        let position = self.next_position;
        self.next_position += 1;
        self.segments.push(TextSegment {
            content: turn.content.clone(),
            timestamp: turn.end_time,
            position,
        });
        tracing::debug!(position, timestamp = turn.end_time, "buffer append");
    }

    /// Space-joined content of all segments whose timestamp is within
    /// `size_seconds` of the newest segment's timestamp, defaulting to
    /// `config.window_duration_secs`.
    ///
    /// Per §9's recommended fix, the cutoff is computed directly in
    /// seconds (`newest - size_seconds`), not multiplied by 1000 as the
    /// reference implementation's buggy version does.
    pub fn get_window(&self, size_seconds: Option<f64>) -> String {
        let Some(newest) = self.segments.last() else {
            return String::new();
        };
        let window = size_seconds.unwrap_or(self.config.window_duration_secs);
        let cutoff = newest.timestamp - window;
        self.segments
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Space-joined content of segments with `timestamp` in `[start, end]`.
    pub fn get_range(&self, start: f64, end: f64) -> String {
        self.segments
            .iter()
            .filter(|s| s.timestamp >= start && s.timestamp <= end)
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The `n` most recently appended segments, in arrival order.
    pub fn get_last_n(&self, n: usize) -> Vec<TextSegment> {
        let len = self.segments.len();
        let start = len.saturating_sub(n);
        self.segments[start..].to_vec()
    }

    /// Regex search over segment content, most-recent matches first, up
    /// to `limit` results (default 10).
    pub fn search(&self, pattern: &str, limit: Option<usize>) -> Result<Vec<TextSegment>, regex::Error> {
        let re = Regex::new(pattern)?;
        let limit = limit.unwrap_or(10);
        Ok(self
            .segments
            .iter()
            .rev()
            .filter(|s| re.is_match(&s.content))
            .take(limit)
            .cloned()
            .collect())
    }

    /// Drops all segments and resets the position counter.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.next_position = 0;
        tracing::debug!("buffer cleared");
    }

    pub fn statistics(&self) -> BufferStatistics {
        BufferStatistics {
            segment_count: self.segments.len(),
            total_chars: self.segments.iter().map(|s| s.content.chars().count()).sum(),
            oldest_timestamp: self.segments.first().map(|s| s.timestamp),
            newest_timestamp: self.segments.last().map(|s| s.timestamp),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
