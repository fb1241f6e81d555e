//! Property test for §8's "the decision queue holds at most one pending
//! job at any instant" invariant, generalized from the two-job scenario
//! in the unit tests to an arbitrary-size burst. Uses a processor with a
//! nonzero delay and paused time so the worker cannot drain the slot
//! between enqueues in the burst — it only runs once, after the whole
//! burst has landed.

use async_trait::async_trait;
use commentator_queue::{DetectionQueue, JobProcessor, QueueEvent};
use commentator_types::{DetectionJob, Turn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct EchoProcessor {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl JobProcessor for EchoProcessor {
    type Output = String;
    type Error = String;

    async fn process(&self, job: DetectionJob) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1)).await;
        Ok(job.turn.id)
    }
}

proptest::proptest! {
    #[test]
    fn burst_enqueue_processes_only_the_last_job(burst_size in 1usize..30) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        rt.block_on(async {
            tokio::time::pause();
            let calls = Arc::new(AtomicUsize::new(0));
            let processor = Arc::new(EchoProcessor { calls: Arc::clone(&calls) });
            let (queue, mut events) = DetectionQueue::with_staleness(processor, Duration::from_secs(60));

            for i in 0..burst_size {
                let job = DetectionJob::new(Turn::new(i.to_string(), "x", 0.0, 1.0), String::new(), String::new(), 0);
                queue.enqueue(job).await;
            }
            tokio::time::advance(Duration::from_millis(100)).await;

            let event = events.recv().await.expect("exactly one event expected");
            match event {
                QueueEvent::Processed { job, .. } => {
                    proptest::prop_assert_eq!(job.turn.id, (burst_size - 1).to_string());
                }
                _ => proptest::prop_assert!(false, "expected Processed"),
            }
            proptest::prop_assert!(events.try_recv().is_err(), "every earlier job in the burst must be silently overwritten");
            proptest::prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
            Ok(())
        })?;
    }
}
