//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: Request/response messages sent to a specific actor via mpsc
//! 2. **Replies**: oneshot channels carry results back to the caller

use serde::Serialize;
use tokio::sync::oneshot;

use crate::storage::StorageResult;

/// Commands that can be sent to the SchedulerActor
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run one tick immediately (bypassing the interval timer)
    ///
    /// Dispatched probes keep running in the background; the reply only
    /// describes what the tick decided.
    TickNow {
        /// Channel to send the result back
        respond_to: oneshot::Sender<StorageResult<TickReport>>,
    },

    /// Gracefully shut down the scheduler
    ///
    /// The actor stops ticking, waits for in-flight probes to commit and
    /// then exits.
    Shutdown,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Enabled devices read from the store
    pub enabled: usize,

    /// Devices whose interval had elapsed
    pub due: usize,

    /// Probes started by this tick
    pub dispatched: usize,

    /// Due devices skipped because an earlier probe is still running
    pub skipped_in_flight: usize,
}
