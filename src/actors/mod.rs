//! Actor-based probe scheduling
//!
//! Each actor runs as an independent async task controlled through a Tokio
//! command channel.
//!
//! ## Architecture Overview
//!
//! ```text
//!                  ┌─────────────────┐
//!                  │   Hub (main)    │
//!                  └────────┬────────┘
//!                           │ spawns
//!              ┌────────────┴────────────┐
//!              │                         │
//!      ┌───────▼────────┐        ┌───────▼───────┐
//!      │ SchedulerActor │        │ Retention task│
//!      └───────┬────────┘        └───────┬───────┘
//!              │ one task per due device │ cleanup_old_logs
//!      ┌───────▼────────┐                │
//!      │  Probe task    │                │
//!      │ (ProbeExecutor)│                │
//!      └───────┬────────┘                │
//!              │ commit_outcome          │
//!      ┌───────▼─────────────────────────▼───┐
//!      │        StorageBackend               │
//!      └─────────────────────────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: The scheduler has an mpsc command channel for control messages
//! 2. **Request/Response**: oneshot channels for synchronous queries
//! 3. **Shared state**: The in-flight registry is shared between the actor
//!    and its probe tasks

pub mod in_flight;
pub mod messages;
pub mod retention;
pub mod scheduler;

pub use messages::{SchedulerCommand, TickReport};
pub use scheduler::{SchedulerHandle, SchedulerSettings};
