//! Comment scheduler (§4.6, C6).
//!
//! After a positive decision, schedules a debounced, cancellable
//! generation call: store and cancel a single `CancellationToken`,
//! replace-on-restart, since the scheduler only ever has at most one
//! pending comment at a time (§3).

mod context;
mod writer;

pub use context::CommentContext;
pub use writer::{CommentGeneratorConfig, WriterConfig, WriterConfigError};

use async_trait::async_trait;
use commentator_types::{Comment, Decision, Turn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation failed: {0}")]
    Failed(String),
    #[error("cancelled")]
    Cancelled,
}

/// What a generation call resolves to once a writer/selector has run.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    Accepted { content: String, writer: String },
    Rejected { reason: String },
}

/// Boundary to the (external, per §1) comment-synthesis LLM calls: the
/// selector "hands off" to one of the configured writers, or rejects.
#[async_trait]
pub trait CommentGenerator: Send + Sync {
    async fn generate(
        &self,
        context: CommentContext,
        writers: &[WriterConfig],
        selector_model: &str,
        selector_instructions: &str,
        cancel: CancellationToken,
    ) -> Result<GenerationOutcome, GenerationError>;
}

/// Events emitted by the scheduler as a pending comment progresses,
/// corresponding to the `comment-started`/`comment-generated`/
/// `comment-rejected`/`error` rows of §4.7's table.
#[derive(Debug)]
pub enum SchedulerEvent {
    Started { turn: Turn },
    Accepted { comment: Comment, turn: Turn },
    Rejected { reason: String, turn: Turn },
    Error { error: String, turn: Turn },
}

/// Debounced, cancellable comment scheduler. Holds at most one pending
/// cancellation token; a new positive decision aborts the prior one
/// before scheduling its own delay + generation call.
pub struct CommentScheduler<G: CommentGenerator + 'static> {
    generator: Arc<G>,
    writers: Vec<WriterConfig>,
    selector_model: String,
    selector_instructions: String,
    pending: Option<CancellationToken>,
    events_tx: mpsc::UnboundedSender<SchedulerEvent>,
}

impl<G: CommentGenerator + 'static> CommentScheduler<G> {
    pub fn new(generator: Arc<G>, config: CommentGeneratorConfig) -> (Self, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                generator,
                writers: config.writers,
                selector_model: config.selector_model,
                selector_instructions: config.selector_instructions,
                pending: None,
                events_tx,
            },
            events_rx,
        )
    }

    /// Aborts any prior pending cancellation token (which propagates into
    /// an in-flight generation call, stopping partial work), then
    /// schedules `decision.suggested_delay_ms` followed by a generation
    /// call for `turn`/`context`.
    pub fn schedule(&mut self, decision: &Decision, turn: Turn, context: CommentContext) {
        self.cancel_pending();

        let token = CancellationToken::new();
        self.pending = Some(token.clone());

        let generator = Arc::clone(&self.generator);
        let writers = self.writers.clone();
        let selector_model = self.selector_model.clone();
        let selector_instructions = self.selector_instructions.clone();
        let events_tx = self.events_tx.clone();
        let delay = Duration::from_millis(decision.suggested_delay_ms);

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(turn_id = %turn.id, "scheduled comment superseded before delay elapsed");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let _ = events_tx.send(SchedulerEvent::Started { turn: turn.clone() });

            let started = std::time::Instant::now();
            let result = generator
                .generate(context, &writers, &selector_model, &selector_instructions, token.clone())
                .await;
            let generation_time_ms = started.elapsed().as_millis() as u64;

            if token.is_cancelled() {
                tracing::debug!(turn_id = %turn.id, "generation cancelled by a superseding decision");
                return;
            }

            match result {
                Ok(GenerationOutcome::Accepted { content, writer }) => {
                    let comment = Comment::new(uuid::Uuid::new_v4().to_string(), content, writer, generation_time_ms, turn.end_time);
                    let _ = events_tx.send(SchedulerEvent::Accepted { comment, turn });
                }
                Ok(GenerationOutcome::Rejected { reason }) => {
                    let _ = events_tx.send(SchedulerEvent::Rejected { reason, turn });
                }
                Err(error) => {
                    let _ = events_tx.send(SchedulerEvent::Error {
                        error: error.to_string(),
                        turn,
                    });
                }
            }
        });
    }

    fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    /// Aborts any pending cancellation token without scheduling a new
    /// one, per the facade teardown contract (§4.7).
    pub fn abort(&mut self) {
        self.cancel_pending();
    }
}
