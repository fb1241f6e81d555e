//! Shared data model for the live-commentary pipeline.
//!
//! Every downstream crate (`commentator-buffer`, `commentator-aggregator`,
//! `commentator-queue`, `commentator-detect`, `commentator-decision`,
//! `commentator-scheduler`, `commentator-core`) depends on this crate for its
//! input/output types. Nothing here holds behavior beyond constructors and
//! small invariant-preserving helpers — no `Result` wrapper anywhere, since
//! nothing in this crate can fail.

mod comment;
mod decision;
mod event;
mod job;
mod turn;

pub use comment::{Comment, CommentMetadata};
pub use decision::{Decision, DecisionFactors, Priority};
pub use event::{Event, EventMetadata, EventType};
pub use job::DetectionJob;
pub use turn::Turn;
