//! Installable network asset cache
//!
//! A worker that runs in its own execution context, isolated from the main
//! application, and mediates every outgoing fetch:
//!
//! - Application-shell resources (documents, scripts, stylesheets, the root
//!   path) use network-first with a fixed timeout, falling back to the
//!   cached copy and finally to the cached root document.
//! - Static assets use cache-first, populating the cache on first fetch.
//! - Non-GET requests and requests to the backend host pass straight
//!   through so dynamic, authenticated responses are never cached.
//!
//! Cache generations are named by version; activating a new version deletes
//! every older generation. The worker and the application communicate only
//! through typed messages ([`WorkerEvent`], [`AppCommand`]), never shared
//! memory.

mod error;
mod fetch;
mod messages;
mod storage;
mod worker;

pub use error::*;
pub use fetch::*;
pub use messages::*;
pub use storage::*;
pub use worker::*;
