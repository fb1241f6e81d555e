use crate::Config;
use commentator_buffer::BufferStatistics;
use serde::{Deserialize, Serialize};

/// Snapshot returned by [`crate::Commentator::get_statistics`] (§6's
/// `getStatistics()` plus §2a's observability-surface addendum —
/// `dynamicThreshold` and `queueDepth` are not in the distilled spec's
/// `{ contextBuffer, uncommentedBuffer, config }` triple but are named
/// explicitly in §2a, so they're carried here too).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub context_buffer: BufferStatistics,
    pub uncommented_buffer: BufferStatistics,
    pub dynamic_threshold: f64,
    pub queue_has_pending_job: bool,
    pub config: Config,
}
