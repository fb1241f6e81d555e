use commentator_types::Event;
use serde::Serialize;

/// Grounding data packaged for a generation call (§4.6).
#[derive(Debug, Clone, Serialize)]
pub struct CommentContext {
    pub current_text: String,
    pub historical_text: String,
    pub uncommented_text: String,
    pub events: Vec<Event>,
    pub previous_comments: Vec<String>,
}

const UNCOMMENTED_TAIL_CHARS: usize = 600;
const HISTORICAL_TAIL_CHARS: usize = 400;
const MAX_SUMMARIZED_EVENTS: usize = 5;

impl CommentContext {
    pub fn new(current_text: String, historical_text: String, uncommented_text: String, events: Vec<Event>) -> Self {
        Self {
            current_text,
            historical_text,
            uncommented_text,
            events,
            previous_comments: Vec::new(),
        }
    }

    /// The primary grounding snippet for writers: the last 600 chars of
    /// `uncommented_text`, falling back to the last 400 of
    /// `historical_text` when the uncommented buffer is empty (§4.6).
    pub fn grounding_snippet(&self) -> String {
        if !self.uncommented_text.is_empty() {
            tail_chars(&self.uncommented_text, UNCOMMENTED_TAIL_CHARS)
        } else {
            tail_chars(&self.historical_text, HISTORICAL_TAIL_CHARS)
        }
    }

    /// Up to 5 events to summarize for the writers.
    pub fn summarized_events(&self) -> &[Event] {
        let n = self.events.len().min(MAX_SUMMARIZED_EVENTS);
        &self.events[..n]
    }
}

fn tail_chars(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        return s.to_string();
    }
    let skip = char_count - max_chars;
    s.chars().skip(skip).collect()
}
