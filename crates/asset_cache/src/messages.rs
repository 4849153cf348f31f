//! Typed messages between the worker and the application
//!
//! The two execution contexts share no memory; these messages and the
//! durable store are their only links.

use serde::{Deserialize, Serialize};

/// Platform sync-event tag that requests a replay of queued operations.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Events the worker broadcasts to every open application client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerEvent {
    /// A new version finished installing and is waiting to activate. The
    /// application typically prompts the user, then sends
    /// [`AppCommand::SkipWaiting`] and reloads.
    UpdateAvailable { version: String },
    /// Connectivity-triggered request for the application to run its own
    /// sync pass.
    BackgroundSync,
}

/// Commands the application sends to the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppCommand {
    /// Activate the newly installed version immediately instead of waiting
    /// for all clients to close.
    SkipWaiting,
}
