//! Short-turn aggregator (§4.2, C2).
//!
//! Merges consecutive brief turns into one synthetic turn substantial
//! enough to justify an LLM call. Split into two layers, as timer-owning
//! components elsewhere in this codebase tend to do:
//!
//! - [`Aggregator`]: the pure, synchronous admission/flush core. No
//!   timers, no async — easy to unit test exhaustively.
//! - [`DebouncedAggregator`]: wraps it with a cancellable debounce
//!   timer using a single-token replace pattern (one token instead of a
//!   per-key map, since only one aggregation window is ever pending).

mod word_count;

use commentator_types::Turn;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use word_count::count_words;

/// Configuration for the short-turn aggregator, mirroring §6's
/// `shortTurnAggregator` group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub min_turn_duration_ms: u64,
    pub aggregation_max_delay_ms: u64,
    pub aggregation_max_gap_ms: u64,
    /// `0` disables the word-count flush trigger.
    pub aggregation_max_words: u64,
    /// `0` disables the total-duration flush trigger.
    pub aggregation_max_total_duration_ms: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            min_turn_duration_ms: 1200,
            aggregation_max_delay_ms: 800,
            aggregation_max_gap_ms: 400,
            aggregation_max_words: 50,
            aggregation_max_total_duration_ms: 12_000,
        }
    }
}

impl AggregatorConfig {
    /// All fields are `>= 0` by type (`u64`); nothing to reject here, but
    /// the method exists for uniformity with the other config groups'
    /// fail-fast `validate()` contract (§2a).
    pub fn validate(&self) -> Result<(), AggregatorConfigError> {
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AggregatorConfigError {}

/// Pure admission/flush core. No timers; `add` either returns a flushed
/// `Turn` immediately or buffers and returns `None`, leaving the caller
/// (normally [`DebouncedAggregator`]) responsible for the debounce timer.
#[derive(Debug, Clone)]
pub struct Aggregator {
    config: AggregatorConfig,
    state: Option<BufferedState>,
}

#[derive(Debug, Clone)]
struct BufferedState {
    content: String,
    start_time: f64,
    last_end_time: f64,
    word_count: u64,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config, state: None }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Admits `turn` into the aggregation. Returns `Some(turn)` if a
    /// flush trigger fired (the aggregator is cleared as a side effect);
    /// returns `None` if the turn was buffered and the caller should
    /// (re)schedule its debounce timer.
    pub fn add(&mut self, turn: &Turn) -> Option<Turn> {
        let discard_for_gap = match &self.state {
            Some(s) => (turn.start_time - s.last_end_time) * 1000.0 > self.config.aggregation_max_gap_ms as f64,
            None => false,
        };

        if self.state.is_none() || discard_for_gap {
            if discard_for_gap {
                tracing::debug!("aggregation gap exceeded, discarding buffered turn");
            }
            self.state = Some(BufferedState {
                content: turn.content.clone(),
                start_time: turn.start_time,
                last_end_time: turn.end_time,
                word_count: count_words(&turn.content),
            });
        } else {
            let s = self.state.as_mut().unwrap();
            s.content.push(' ');
            s.content.push_str(&turn.content);
            s.last_end_time = turn.end_time;
            s.word_count += count_words(&turn.content);
        }

        if self.should_flush() {
            let s = self.state.take().unwrap();
            tracing::debug!(
                start = s.start_time,
                end = s.last_end_time,
                words = s.word_count,
                "aggregator flush"
            );
            return Some(Turn::new(turn.id.clone(), s.content, s.start_time, s.last_end_time));
        }
        None
    }

    fn should_flush(&self) -> bool {
        let Some(s) = &self.state else { return false };
        let elapsed_ms = (s.last_end_time - s.start_time) * 1000.0;
        if elapsed_ms >= self.config.min_turn_duration_ms as f64 {
            return true;
        }
        if self.config.aggregation_max_words > 0 && s.word_count >= self.config.aggregation_max_words {
            return true;
        }
        if self.config.aggregation_max_total_duration_ms > 0
            && elapsed_ms >= self.config.aggregation_max_total_duration_ms as f64
        {
            return true;
        }
        false
    }

    /// Flushes whatever is currently buffered as a debounce-timeout turn,
    /// whose `id` is the string form of the buffered start time (§4.2).
    /// Returns `None` if nothing is buffered.
    pub fn flush_for_timeout(&mut self) -> Option<Turn> {
        let s = self.state.take()?;
        tracing::debug!(start = s.start_time, end = s.last_end_time, "aggregator debounce timeout flush");
        Some(Turn::new(s.start_time.to_string(), s.content, s.start_time, s.last_end_time))
    }

    /// Discards any buffered partial aggregation without emitting it.
    pub fn clear(&mut self) {
        self.state = None;
    }
}

/// Wraps [`Aggregator`] with a cancellable debounce timer. On every `add`
/// that does not flush synchronously, the prior pending timer (if any) is
/// cancelled and a new one scheduled for `aggregation_max_delay_ms`; on
/// fire, the buffered turn is sent over the returned channel.
pub struct DebouncedAggregator {
    inner: Arc<Mutex<Aggregator>>,
    pending_timer: Option<CancellationToken>,
    timeout_tx: mpsc::UnboundedSender<Turn>,
}

impl DebouncedAggregator {
    pub fn new(config: AggregatorConfig) -> (Self, mpsc::UnboundedReceiver<Turn>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: Arc::new(Mutex::new(Aggregator::new(config))),
                pending_timer: None,
                timeout_tx: tx,
            },
            rx,
        )
    }

    pub fn add(&mut self, turn: Turn) -> Option<Turn> {
        self.cancel_timer();
        let flushed = self.inner.lock().unwrap().add(&turn);
        if flushed.is_some() {
            return flushed;
        }
        self.schedule_timer();
        None
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.pending_timer.take() {
            token.cancel();
        }
    }

    fn schedule_timer(&mut self) {
        let token = CancellationToken::new();
        self.pending_timer = Some(token.clone());
        let inner = Arc::clone(&self.inner);
        let tx = self.timeout_tx.clone();
        let delay_ms = self.inner.lock().unwrap().config().aggregation_max_delay_ms;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("aggregator debounce timer cancelled");
                }
                _ = tokio::time::sleep(std::time::Duration::from_millis(delay_ms)) => {
                    let flushed = inner.lock().unwrap().flush_for_timeout();
                    if let Some(turn) = flushed {
                        let _ = tx.send(turn);
                    }
                }
            }
        });
    }

    /// Cancels any pending timer and discards buffered partial state.
    /// Guarantees the timer is cancelled, matching §4.2's teardown
    /// contract.
    pub fn clear(&mut self) {
        self.cancel_timer();
        self.inner.lock().unwrap().clear();
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().unwrap().is_active()
    }
}

impl Drop for DebouncedAggregator {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
