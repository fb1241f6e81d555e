//! Latest-wins detection queue (§4.3, C3) — the scheduling core.
//!
//! A single-slot mailbox, not a FIFO: `enqueue` overwrites any job still
//! waiting to be picked up, and a serial worker drains the slot one job
//! at a time. This is a "only the newest survives" discipline,
//! generalized from a bounded ring of chunks to a single overwritable
//! slot, since an unbounded channel would violate the prefer-latest
//! invariant outright.

use async_trait::async_trait;
use commentator_types::DetectionJob;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::Instant;

/// Wall-clock age beyond which a pending job is dropped rather than
/// processed (§4.3). Staleness here is measured against
/// [`tokio::time::Instant`], not the epoch-ms stamp carried on
/// `DetectionJob` itself, so staleness tests can use
/// `tokio::time::{pause, advance}` instead of real sleeps.
pub const MAX_TURN_STALENESS_MS: u64 = 5_000;

/// The single fallible async step a job goes through once dequeued.
/// `commentator-core` implements this over the detector adapter.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    type Output: Send;
    type Error: std::fmt::Display + Send;

    async fn process(&self, job: DetectionJob) -> Result<Self::Output, Self::Error>;
}

/// Outcome of one worker iteration, delivered to the queue's event
/// channel for the facade to translate into `events-detected`/`error`.
pub enum QueueEvent<O, E> {
    Processed {
        job: DetectionJob,
        output: O,
        processing_time_ms: u64,
    },
    Stale {
        job: DetectionJob,
    },
    Error {
        job: DetectionJob,
        error: E,
    },
}

struct Slot {
    job: Option<DetectionJob>,
    enqueued_at: Option<Instant>,
}

/// A single-slot, latest-wins work queue with a serial worker.
pub struct DetectionQueue<P: JobProcessor + 'static> {
    slot: Arc<Mutex<Slot>>,
    notify: Arc<Notify>,
    worker_running: Arc<AtomicBool>,
    processor: Arc<P>,
    max_staleness: Duration,
    events_tx: mpsc::UnboundedSender<QueueEvent<P::Output, P::Error>>,
}

impl<P: JobProcessor + 'static> DetectionQueue<P> {
    pub fn new(processor: Arc<P>) -> (Self, mpsc::UnboundedReceiver<QueueEvent<P::Output, P::Error>>) {
        Self::with_staleness(processor, Duration::from_millis(MAX_TURN_STALENESS_MS))
    }

    pub fn with_staleness(
        processor: Arc<P>,
        max_staleness: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<QueueEvent<P::Output, P::Error>>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let queue = Self {
            slot: Arc::new(Mutex::new(Slot {
                job: None,
                enqueued_at: None,
            })),
            notify: Arc::new(Notify::new()),
            worker_running: Arc::new(AtomicBool::new(false)),
            processor,
            max_staleness,
            events_tx,
        };
        (queue, events_rx)
    }

    /// Stamps the job's enqueue instant, overwrites any pending job, and
    /// ensures the worker is running. Any previously pending (not yet
    /// dequeued) job is silently dropped — the newest input wins.
    pub async fn enqueue(&self, job: DetectionJob) {
        {
            let mut slot = self.slot.lock().await;
            if slot.job.is_some() {
                tracing::debug!("detection queue: overwriting pending job with newer turn");
            }
            slot.job = Some(job);
            slot.enqueued_at = Some(Instant::now());
        }
        self.notify.notify_one();
        self.ensure_worker();
    }

    /// Drops the pending job, if any, without processing it.
    pub async fn clear(&self) {
        let mut slot = self.slot.lock().await;
        slot.job = None;
        slot.enqueued_at = None;
    }

    fn ensure_worker(&self) {
        if self
            .worker_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let slot = Arc::clone(&self.slot);
        let notify = Arc::clone(&self.notify);
        let worker_running = Arc::clone(&self.worker_running);
        let processor = Arc::clone(&self.processor);
        let max_staleness = self.max_staleness;
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            loop {
                let popped = {
                    let mut guard = slot.lock().await;
                    match (guard.job.take(), guard.enqueued_at.take()) {
                        (Some(job), Some(enqueued_at)) => Some((job, enqueued_at)),
                        _ => None,
                    }
                };

                let Some((job, enqueued_at)) = popped else {
                    worker_running.store(false, Ordering::SeqCst);
                    // Re-check: a job may have been enqueued between our
                    // take() returning None and the flag flip above.
                    let still_empty = slot.lock().await.job.is_none();
                    if still_empty {
                        break;
                    }
                    if worker_running
                        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                        .is_err()
                    {
                        break;
                    }
                    continue;
                };

                if enqueued_at.elapsed() > max_staleness {
                    tracing::debug!(turn_id = %job.turn.id, "dropping stale detection job");
                    let _ = events_tx.send(QueueEvent::Stale { job });
                    continue;
                }

                let started = Instant::now();
                let job_for_error = job.clone();
                match processor.process(job).await {
                    Ok(output) => {
                        let processing_time_ms = started.elapsed().as_millis() as u64;
                        let _ = events_tx.send(QueueEvent::Processed {
                            job: job_for_error,
                            output,
                            processing_time_ms,
                        });
                    }
                    Err(error) => {
                        let _ = events_tx.send(QueueEvent::Error {
                            job: job_for_error,
                            error,
                        });
                    }
                }
            }
        });
    }

    /// Whether a job is currently sitting in the slot, waiting to be
    /// picked up by the worker. Exposed for the facade's statistics
    /// snapshot (§2a); a job that is already in-flight inside `process`
    /// does not count.
    pub async fn has_pending(&self) -> bool {
        self.slot.lock().await.job.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commentator_types::Turn;
    use std::sync::atomic::AtomicU32;
    use tokio::time::Duration as TokioDuration;

    fn job(id: &str) -> DetectionJob {
        DetectionJob::new(Turn::new(id, "hello", 0.0, 1.0), String::new(), String::new(), 0)
    }

    struct EchoProcessor {
        delay: TokioDuration,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl JobProcessor for EchoProcessor {
        type Output = String;
        type Error = String;

        async fn process(&self, job: DetectionJob) -> Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(job.turn.id)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn latest_wins_scenario_2() {
        let calls = Arc::new(AtomicU32::new(0));
        let processor = Arc::new(EchoProcessor {
            delay: TokioDuration::from_millis(1),
            calls: Arc::clone(&calls),
        });
        let (queue, mut events) = DetectionQueue::with_staleness(processor, Duration::from_secs(5));

        queue.enqueue(job("J1")).await;
        tokio::time::advance(TokioDuration::from_millis(5)).await;
        queue.enqueue(job("J2")).await;

        tokio::time::advance(TokioDuration::from_millis(50)).await;
        let event = events.recv().await.expect("one event expected");
        match event {
            QueueEvent::Processed { job, .. } => assert_eq!(job.turn.id, "J2"),
            other => panic!("expected Processed, got {other:?}"),
        }
        assert!(events.try_recv().is_err(), "J1 must never be processed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    impl<O: std::fmt::Debug, E: std::fmt::Debug> std::fmt::Debug for QueueEvent<O, E> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                QueueEvent::Processed { job, output, processing_time_ms } => f
                    .debug_struct("Processed")
                    .field("job", &job.turn.id)
                    .field("output", output)
                    .field("processing_time_ms", processing_time_ms)
                    .finish(),
                QueueEvent::Stale { job } => f.debug_struct("Stale").field("job", &job.turn.id).finish(),
                QueueEvent::Error { job, error } => {
                    f.debug_struct("Error").field("job", &job.turn.id).field("error", error).finish()
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn staleness_drop_scenario_3() {
        let calls = Arc::new(AtomicU32::new(0));
        let processor = Arc::new(EchoProcessor {
            delay: TokioDuration::from_millis(10),
            calls: Arc::clone(&calls),
        });
        let (queue, mut events) = DetectionQueue::with_staleness(processor, Duration::from_secs(5));

        queue.enqueue(job("J")).await;
        // Advance wall clock by 6s before the worker gets a chance to pick
        // the job up — note the worker task hasn't run yet since nothing
        // has yielded.
        tokio::time::advance(TokioDuration::from_secs(6)).await;
        tokio::task::yield_now().await;

        let event = events.recv().await.expect("stale drop expected");
        match event {
            QueueEvent::Stale { job } => assert_eq!(job.turn.id, "J"),
            other => panic!("expected Stale, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0, "process must never run on a stale job");
    }

    #[tokio::test]
    async fn clear_drops_pending_job() {
        let processor = Arc::new(EchoProcessor {
            delay: TokioDuration::from_millis(50),
            calls: Arc::new(AtomicU32::new(0)),
        });
        let (queue, _events) = DetectionQueue::with_staleness(processor, Duration::from_secs(5));
        // Enqueue without giving the worker a chance to start draining.
        {
            let mut slot = queue.slot.lock().await;
            slot.job = Some(job("J"));
            slot.enqueued_at = Some(Instant::now());
        }
        assert!(queue.has_pending().await);
        queue.clear().await;
        assert!(!queue.has_pending().await);
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_process_runs_concurrently() {
        let calls = Arc::new(AtomicU32::new(0));
        let processor = Arc::new(EchoProcessor {
            delay: TokioDuration::from_millis(20),
            calls: Arc::clone(&calls),
        });
        let (queue, mut events) = DetectionQueue::with_staleness(processor, Duration::from_secs(5));

        queue.enqueue(job("J1")).await;
        tokio::time::advance(TokioDuration::from_millis(1)).await;
        tokio::task::yield_now().await;
        // J1 is now in-flight (sleeping 20ms); enqueue J2 mid-flight.
        queue.enqueue(job("J2")).await;

        tokio::time::advance(TokioDuration::from_millis(100)).await;
        let first = events.recv().await.unwrap();
        match first {
            QueueEvent::Processed { job, .. } => assert_eq!(job.turn.id, "J1", "in-flight job is not cancelled"),
            other => panic!("expected Processed, got {other:?}"),
        }
        let second = events.recv().await.unwrap();
        match second {
            QueueEvent::Processed { job, .. } => assert_eq!(job.turn.id, "J2"),
            other => panic!("expected Processed, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
