//! Persistent media task queue.
//!
//! A single background worker drains the durable `media_tasks` table one
//! task at a time, with spacing between dispatches, bounded retries and a
//! periodic cleanup sweep over finished rows. Task payloads are opaque to
//! the queue; the actual work is behind the [`Enrich`] trait.

pub mod enrich;
pub mod error;
pub mod queue;

pub use enrich::Enrich;
pub use error::{QueueError, QueueResult};
pub use queue::{QueueConfig, QueueStatus, TaskQueue};
