//! Local store - durable persistence for offline work
//!
//! This crate owns the embedded database that survives application restarts.
//! It holds two record sets:
//!
//! - Queued *operations*: create/update/delete actions captured while the
//!   application could not reach the remote store, waiting to be replayed.
//! - *Cached entities*: the last-known snapshot of remote records, served
//!   to the read path when the remote store is unreachable.
//!
//! The store is explicitly constructed and passed to its consumers; it is
//! not a global. All writes are atomic at the single-record level.

mod cache;
mod error;
mod operation;
mod schema;
mod store;

pub use cache::*;
pub use error::*;
pub use operation::*;
pub use store::*;
