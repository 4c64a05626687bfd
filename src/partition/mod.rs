//! Partition module: typed spans of the console document.
//!
//! This module contains:
//! - [`Partition`]: one span, attributed to an input or output stream
//! - [`PendingWrites`]: output queued by producers, coalesced per stream
//! - [`Partitioner`]: keeps partitions in step with the document

#[allow(clippy::module_inception)]
mod partition;
mod partitioner;
mod pending;

pub use partition::{ContentType, Partition, PartitionId, PartitionKind, StreamId};
pub use partitioner::{InputSink, Partitioner, WaterMarks};
pub use pending::{PendingWrite, PendingWrites};
