//! The registry: authoritative transactional store for workflow records
//!
//! Holds specialties, streams, topics, and submissions in one world behind
//! an async RwLock. Mutating operations run as write-guard transactions:
//! the whole read-check-write sequence executes against a private copy of
//! the world which is swapped in only after the transaction (and snapshot
//! write, when configured) succeeds. Concurrent writers serialize; a failed
//! transaction leaves no trace.

pub mod records;
pub mod snapshot;
pub mod store;

pub use records::{
    MemberRole, Specialty, Stream, Submission, SubmissionStatus, Topic, TopicStatus,
};
pub use store::{Registry, RegistryStats, World};
