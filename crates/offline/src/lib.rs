//! Offline-first synchronization core
//!
//! This crate lets create/update/delete actions be captured while the
//! application is disconnected and replayed against the remote store once
//! connectivity returns. It provides:
//!
//! - Network state monitoring with a one-shot "just reconnected" edge
//! - A durable operation queue with sequential replay and retry
//! - A cache-aware read path that degrades to local snapshots
//! - A uniform form-submission wrapper every write goes through
//! - An explicit registry mapping logical entities to remote tables
//!
//! The remote store is consumed only through the [`RemoteTable`] trait;
//! authentication, querying internals, and UI concerns stay outside.

mod error;
mod forms;
mod network;
mod queue;
mod read;
mod registry;
mod remote;

pub use error::*;
pub use forms::*;
pub use network::*;
pub use queue::*;
pub use read::*;
pub use registry::*;
pub use remote::*;

// Re-export the store types callers interact with.
pub use local_store::{
    CachedEntity, LocalStore, Operation, OperationDraft, OperationStatus, OperationType,
};
