use serde::{Deserialize, Serialize};

/// Per-comment metadata; `timestamp` is the media-time (turn `end_time`)
/// the comment was generated for. Unlike the reference implementation
/// (§9), this field is mandatory — there is no wall-clock fallback, so
/// `DecisionEngine::update_history` can never contaminate `last_comment_time`
/// with an epoch-ms value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentMetadata {
    pub timestamp: f64,
}

/// A single natural-language comment accepted by a writer/selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub writer: String,
    pub length: usize,
    pub generation_time_ms: u64,
    pub metadata: CommentMetadata,
}

impl Comment {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        writer: impl Into<String>,
        generation_time_ms: u64,
        timestamp: f64,
    ) -> Self {
        let content = content.into();
        let length = content.chars().count();
        Self {
            id: id.into(),
            content,
            writer: writer.into(),
            length,
            generation_time_ms,
            metadata: CommentMetadata { timestamp },
        }
    }
}
