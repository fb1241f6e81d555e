//! Property test generalizing the "new positive decision cancels prior
//! pending" unit test to an arbitrary-size burst of superseding
//! decisions: only the last one scheduled should ever reach
//! `Accepted`/`Rejected`.

use async_trait::async_trait;
use commentator_scheduler::{
    CommentContext, CommentGenerator, CommentGeneratorConfig, CommentScheduler, GenerationError, GenerationOutcome, SchedulerEvent,
    WriterConfig,
};
use commentator_types::{Decision, DecisionFactors, Priority, Turn};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct AcceptingGenerator;

#[async_trait]
impl CommentGenerator for AcceptingGenerator {
    async fn generate(
        &self,
        _context: CommentContext,
        _writers: &[WriterConfig],
        _selector_model: &str,
        _selector_instructions: &str,
        cancel: CancellationToken,
    ) -> Result<GenerationOutcome, GenerationError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            _ = tokio::time::sleep(Duration::from_millis(5)) => Ok(GenerationOutcome::Accepted {
                content: "generated".into(),
                writer: "observational".into(),
            }),
        }
    }
}

fn decision() -> Decision {
    Decision {
        should_comment: true,
        score: 0.9,
        confidence: 0.9,
        factors: DecisionFactors::default(),
        priority: Priority::Low,
        suggested_delay_ms: 50,
        reasoning: String::new(),
    }
}

fn context() -> CommentContext {
    CommentContext::new(String::new(), String::new(), String::new(), vec![])
}

proptest::proptest! {
    #[test]
    fn only_the_last_scheduled_decision_ever_resolves(burst_size in 1usize..20) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        rt.block_on(async {
            tokio::time::pause();
            let (mut scheduler, mut events) = CommentScheduler::new(Arc::new(AcceptingGenerator), CommentGeneratorConfig::default());

            for i in 0..burst_size {
                scheduler.schedule(&decision(), Turn::new(i.to_string(), "x", 0.0, 1.0), context());
            }
            tokio::time::advance(Duration::from_millis(500)).await;

            let started = events.recv().await.expect("Started expected");
            match started {
                SchedulerEvent::Started { turn } => proptest::prop_assert_eq!(turn.id, (burst_size - 1).to_string()),
                _ => proptest::prop_assert!(false, "expected Started"),
            }
            let accepted = events.recv().await.expect("Accepted expected");
            match accepted {
                SchedulerEvent::Accepted { turn, .. } => proptest::prop_assert_eq!(turn.id, (burst_size - 1).to_string()),
                _ => proptest::prop_assert!(false, "expected Accepted"),
            }
            proptest::prop_assert!(events.try_recv().is_err(), "no earlier superseded decision may resolve");
            Ok(())
        })?;
    }
}
