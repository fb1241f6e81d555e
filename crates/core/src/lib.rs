//! System facade (§4.7, C7) — binds the aggregator, detection queue,
//! decision engine, and comment scheduler into one `onTurnCompleted`
//! pipeline and exposes a typed event surface.
//!
//! **Concurrency design (deviation from a literal single-task reading of
//! §5).** The distilled spec's reference model runs the facade, the
//! aggregator timer, the queue worker, and the scheduler delay all on one
//! cooperative task. Here three long-lived tasks share one
//! `Arc<tokio::sync::Mutex<FacadeState>>`: the queue's own worker (owned
//! by `commentator-queue`), a task draining the queue's output into
//! decisions, and a task draining the scheduler's output into comment
//! events — because the queue worker and the scheduler's delayed
//! generation call both need to suspend on external I/O without blocking
//! new turn ingestion. Every state mutation still holds the lock for the
//! full duration of its synchronous critical section, reproducing §5's
//! atomicity guarantee ("`comment-generated` handler runs atomically
//! before subsequent events may observe post-emit state") without a
//! single OS task: `Arc`-shared, `Mutex`-guarded state with narrow
//! getter/setter methods, plus a single-token cancel-and-replace
//! pattern for the aggregator's debounce timer.

mod bus;
mod config;
mod statistics;

pub use bus::{emit_isolated, EventBus, InMemoryEventBus, NullEventBus, SystemEvent};
pub use config::{Config, ConfigError};
pub use statistics::Statistics;

use async_trait::async_trait;
use commentator_aggregator::Aggregator;
use commentator_buffer::TextBuffer;
use commentator_decision::DecisionEngine;
use commentator_detect::{DetectionError, EventDetector};
use commentator_llm::LlmProvider;
use commentator_queue::{DetectionQueue, JobProcessor, QueueEvent};
use commentator_scheduler::{CommentContext, CommentGenerator, CommentScheduler, SchedulerEvent};
use commentator_types::{DetectionJob, Event, Turn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Adapts [`EventDetector`] to the queue's [`JobProcessor`] boundary.
struct DetectorJobProcessor {
    detector: EventDetector,
}

#[async_trait]
impl JobProcessor for DetectorJobProcessor {
    type Output = Vec<Event>;
    type Error = DetectionError;

    /// Re-checks staleness before calling the detector, mirroring the
    /// queue worker's own dequeue-time gate (§5's "defensive symmetry" —
    /// applied both at dequeue and again here, immediately before the
    /// detector call that the dequeue-time check is meant to avoid).
    async fn process(&self, job: DetectionJob) -> Result<Vec<Event>, DetectionError> {
        let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        if now_ms.saturating_sub(job.enqueued_at_ms) > commentator_queue::MAX_TURN_STALENESS_MS {
            return Err(DetectionError::Stale);
        }
        self.detector.detect(&job, None).await
    }
}

/// State shared across the facade's background tasks. Every mutation
/// happens while holding the single `Mutex`, for the full duration of
/// its synchronous critical section.
struct FacadeState {
    context_buffer: TextBuffer,
    uncommented_buffer: TextBuffer,
    aggregator: Aggregator,
    decision_engine: DecisionEngine,
    pending_aggregator_timer: Option<CancellationToken>,
}

/// Bound pipeline for one live stream. Construct with [`Commentator::create`];
/// multiple instances are fully isolated from one another (§5).
pub struct Commentator<G: CommentGenerator + 'static> {
    state: Arc<Mutex<FacadeState>>,
    config: Config,
    queue: Arc<DetectionQueue<DetectorJobProcessor>>,
    scheduler: Arc<Mutex<CommentScheduler<G>>>,
    bus: Arc<dyn EventBus>,
    tasks: Vec<JoinHandle<()>>,
}

impl<G: CommentGenerator + 'static> Commentator<G> {
    /// Validates `config`, wires every component, and starts the
    /// background tasks. Fails fast on an invalid config (§7) rather
    /// than constructing a half-working facade.
    pub fn create(
        config: Config,
        llm_provider: Arc<dyn LlmProvider>,
        generator: Arc<G>,
        bus: Arc<dyn EventBus>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let state = Arc::new(Mutex::new(FacadeState {
            context_buffer: TextBuffer::new(config.context_buffer.clone()),
            uncommented_buffer: TextBuffer::new(config.uncommented_buffer.clone()),
            aggregator: Aggregator::new(config.aggregator.clone()),
            decision_engine: DecisionEngine::new(config.decision.clone()),
            pending_aggregator_timer: None,
        }));

        let detector = EventDetector::new(llm_provider, config.detector.clone());
        let processor = Arc::new(DetectorJobProcessor { detector });
        let (queue, queue_events) = DetectionQueue::new(processor);
        let queue = Arc::new(queue);

        let (scheduler, scheduler_events) = CommentScheduler::new(generator, config.generator.clone());
        let scheduler = Arc::new(Mutex::new(scheduler));

        let mut tasks = Vec::new();
        tasks.push(spawn_queue_listener(
            Arc::clone(&state),
            Arc::clone(&scheduler),
            Arc::clone(&bus),
            queue_events,
        ));
        tasks.push(spawn_scheduler_listener(Arc::clone(&state), Arc::clone(&bus), scheduler_events));

        Ok(Self {
            state,
            config,
            queue,
            scheduler,
            bus,
            tasks,
        })
    }

    /// Accepts a completed turn. Returns once the turn has been appended
    /// to both buffers and, if ready, enqueued for detection; the
    /// detection/decision/generation pipeline itself runs on the
    /// background tasks started by [`Self::create`].
    pub async fn on_turn_completed(&self, turn: Turn) {
        let ready_turn = {
            let mut state = self.state.lock().await;
            state.context_buffer.append(&turn);
            state.uncommented_buffer.append(&turn);

            if turn.duration_ms() >= self.config.aggregator.min_turn_duration_ms as f64 {
                if let Some(token) = state.pending_aggregator_timer.take() {
                    token.cancel();
                }
                state.aggregator.clear();
                Some(turn)
            } else {
                match state.aggregator.add(&turn) {
                    Some(flushed) => {
                        if let Some(token) = state.pending_aggregator_timer.take() {
                            token.cancel();
                        }
                        Some(flushed)
                    }
                    None => {
                        self.reschedule_aggregator_timer(&mut state);
                        None
                    }
                }
            }
        };

        if let Some(turn) = ready_turn {
            self.enqueue_job(turn).await;
        }
    }

    fn reschedule_aggregator_timer(&self, state: &mut FacadeState) {
        if let Some(token) = state.pending_aggregator_timer.take() {
            token.cancel();
        }
        let token = CancellationToken::new();
        state.pending_aggregator_timer = Some(token.clone());

        let delay = Duration::from_millis(self.config.aggregator.aggregation_max_delay_ms);
        let state_ref = Arc::clone(&self.state);
        let queue = Arc::clone(&self.queue);

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("aggregator debounce timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    let flushed = {
                        let mut state = state_ref.lock().await;
                        state.pending_aggregator_timer = None;
                        state.aggregator.flush_for_timeout()
                    };
                    if let Some(turn) = flushed {
                        enqueue_job_with(&state_ref, &queue, turn).await;
                    }
                }
            }
        });
    }

    async fn enqueue_job(&self, turn: Turn) {
        enqueue_job_with(&self.state, &self.queue, turn).await;
    }

    /// Returns a point-in-time snapshot suitable for a host to log or
    /// display (§6's `getStatistics()`, enriched per §2a).
    pub async fn get_statistics(&self) -> Statistics {
        let state = self.state.lock().await;
        Statistics {
            context_buffer: state.context_buffer.statistics(),
            uncommented_buffer: state.uncommented_buffer.statistics(),
            dynamic_threshold: state.decision_engine.dynamic_threshold(),
            queue_has_pending_job: self.queue.has_pending().await,
            config: self.config.clone(),
        }
    }

    /// Clears both buffers, the aggregator (cancelling its timer), the
    /// decision engine's history, the scheduler's pending comment, and
    /// the detection queue (§4.7's teardown contract). The background
    /// tasks keep running; call this to reset state without tearing the
    /// pipeline down.
    pub async fn clear(&self) {
        {
            let mut state = self.state.lock().await;
            state.context_buffer.clear();
            state.uncommented_buffer.clear();
            state.aggregator.clear();
            state.decision_engine.clear();
            if let Some(token) = state.pending_aggregator_timer.take() {
                token.cancel();
            }
        }
        self.scheduler.lock().await.abort();
        self.queue.clear().await;
    }

    /// Scoped teardown: clears all state, then aborts the background
    /// tasks started by `create`. The facade is inert afterward.
    pub async fn shutdown(mut self) {
        self.clear().await;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

async fn enqueue_job_with(state: &Arc<Mutex<FacadeState>>, queue: &Arc<DetectionQueue<DetectorJobProcessor>>, turn: Turn) {
    let (uncommented_text, full_context) = {
        let state = state.lock().await;
        (state.uncommented_buffer.get_window(None), state.context_buffer.get_window(None))
    };
    let enqueued_at_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let job = DetectionJob::new(turn, uncommented_text, full_context, enqueued_at_ms);
    queue.enqueue(job).await;
}

fn spawn_queue_listener<G: CommentGenerator + 'static>(
    state: Arc<Mutex<FacadeState>>,
    scheduler: Arc<Mutex<CommentScheduler<G>>>,
    bus: Arc<dyn EventBus>,
    mut queue_events: tokio::sync::mpsc::UnboundedReceiver<QueueEvent<Vec<Event>, DetectionError>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = queue_events.recv().await {
            match event {
                QueueEvent::Processed {
                    job,
                    output: events,
                    processing_time_ms,
                } => {
                    emit_isolated(
                        bus.as_ref(),
                        SystemEvent::EventsDetected {
                            events: events.clone(),
                            turn: job.turn.clone(),
                            processing_time_ms,
                        },
                    );

                    let (decision, context) = {
                        let mut state = state.lock().await;
                        let decision = state.decision_engine.evaluate(&events, job.turn.end_time);
                        let context = CommentContext::new(
                            job.turn.content.clone(),
                            state.context_buffer.get_window(None),
                            state.uncommented_buffer.get_window(None),
                            events,
                        );
                        (decision, context)
                    };

                    emit_isolated(
                        bus.as_ref(),
                        SystemEvent::DecisionMade {
                            decision: decision.clone(),
                            turn: job.turn.clone(),
                            processing_time_ms,
                        },
                    );

                    if decision.should_comment {
                        scheduler.lock().await.schedule(&decision, job.turn, context);
                    }
                }
                QueueEvent::Stale { job } => {
                    tracing::debug!(turn_id = %job.turn.id, "dropped stale detection job");
                }
                QueueEvent::Error {
                    job,
                    error: DetectionError::Stale,
                } => {
                    // Defensive re-check tripped inside `process` itself
                    // (§5); treat it the same as a dequeue-time stale
                    // drop rather than an `error` event (§7).
                    tracing::debug!(turn_id = %job.turn.id, "dropped stale detection job (defensive check)");
                }
                QueueEvent::Error { job, error } => {
                    emit_isolated(
                        bus.as_ref(),
                        SystemEvent::Error {
                            error: error.to_string(),
                            turn: Some(job.turn),
                        },
                    );
                }
            }
        }
    })
}

fn spawn_scheduler_listener(
    state: Arc<Mutex<FacadeState>>,
    bus: Arc<dyn EventBus>,
    mut scheduler_events: tokio::sync::mpsc::UnboundedReceiver<SchedulerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = scheduler_events.recv().await {
            match event {
                SchedulerEvent::Started { turn } => {
                    emit_isolated(bus.as_ref(), SystemEvent::CommentStarted { turn });
                }
                SchedulerEvent::Accepted { comment, turn } => {
                    {
                        let mut state = state.lock().await;
                        state.decision_engine.update_history(comment.clone());
                        state.uncommented_buffer.clear();
                    }
                    emit_isolated(bus.as_ref(), SystemEvent::CommentGenerated { comment, turn });
                }
                SchedulerEvent::Rejected { reason, turn } => {
                    emit_isolated(bus.as_ref(), SystemEvent::CommentRejected { reason, turn });
                }
                SchedulerEvent::Error { error, turn } => {
                    emit_isolated(bus.as_ref(), SystemEvent::Error { error, turn: Some(turn) });
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use commentator_llm::{CompletionRequest, LlmError};
    use commentator_scheduler::{GenerationError, GenerationOutcome, WriterConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubLlm {
        response: String,
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
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

    struct StubGenerator {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CommentGenerator for StubGenerator {
        async fn generate(
            &self,
            _context: CommentContext,
            _writers: &[WriterConfig],
            _selector_model: &str,
            _selector_instructions: &str,
            _cancel: CancellationToken,
        ) -> Result<GenerationOutcome, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GenerationOutcome::Accepted {
                content: "a generated comment about the discussion".into(),
                writer: "observational".into(),
            })
        }
    }

    fn detection_response() -> String {
        serde_json::json!({
            "events": [
                {"type": "key_point", "confidence": 0.99, "intensity": 0.99, "triggers": [], "reasoning": "r", "content_quality_score": 9}
            ],
            "context_language": "en"
        })
        .to_string()
    }

    fn high_priority_config() -> Config {
        let mut config = Config::default();
        config.aggregator.min_turn_duration_ms = 0;
        config.decision.base_threshold = 0.01;
        config.decision.min_interval_secs = 0.0;
        config
    }

    #[tokio::test(start_paused = true)]
    async fn turn_completed_flows_through_to_comment_generated() {
        let bus = Arc::new(InMemoryEventBus::new());
        let llm = Arc::new(StubLlm {
            response: detection_response(),
        });
        let generator = Arc::new(StubGenerator {
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let system = Commentator::create(high_priority_config(), llm, generator, Arc::clone(&bus) as Arc<dyn EventBus>).unwrap();

        system
            .on_turn_completed(Turn::new("t1", "a genuinely long turn of spoken content", 0.0, 5.0))
            .await;

        // Drive the queue worker, decision, and scheduler delay to completion.
        for _ in 0..20 {
            tokio::time::advance(Duration::from_millis(500)).await;
            tokio::task::yield_now().await;
        }

        let events = bus.events();
        assert!(
            events.iter().any(|e| matches!(e, SystemEvent::EventsDetected { .. })),
            "expected an EventsDetected event, got {events:?}"
        );
        assert!(
            events.iter().any(|e| matches!(e, SystemEvent::CommentGenerated { .. })),
            "expected a CommentGenerated event, got {events:?}"
        );

        let stats = system.get_statistics().await;
        assert_eq!(
            stats.uncommented_buffer.segment_count, 0,
            "uncommented buffer must be empty after a comment is emitted"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn clear_resets_buffers_and_aborts_pending_comment() {
        let bus = Arc::new(InMemoryEventBus::new());
        let llm = Arc::new(StubLlm {
            response: detection_response(),
        });
        let generator = Arc::new(StubGenerator {
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let system = Commentator::create(high_priority_config(), llm, generator, Arc::clone(&bus) as Arc<dyn EventBus>).unwrap();

        system.on_turn_completed(Turn::new("t1", "hello there friends", 0.0, 5.0)).await;
        tokio::time::advance(Duration::from_millis(100)).await;
        tokio::task::yield_now().await;

        system.clear().await;
        let stats = system.get_statistics().await;
        assert_eq!(stats.context_buffer.segment_count, 0);
        assert_eq!(stats.uncommented_buffer.segment_count, 0);
    }

    #[test]
    fn create_rejects_invalid_config() {
        let mut config = Config::default();
        config.decision.topic_weight = 5.0;
        let bus = Arc::new(NullEventBus);
        let llm = Arc::new(StubLlm { response: String::new() });
        let generator = Arc::new(StubGenerator {
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let result = Commentator::create(config, llm, generator, bus);
        assert!(result.is_err());
    }
}
