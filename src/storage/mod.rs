//! Storage backends for devices, probe results and templates
//!
//! This module provides a trait-based abstraction over the device store,
//! the append-only result log and the template library.
//!
//! ## Design
//!
//! - **Trait-based**: `StorageBackend` trait allows swapping implementations
//! - **Async**: All operations are async for compatibility with Tokio actors
//! - **Atomic commits**: A probe outcome updates the device and appends the
//!   log entry as one unit
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database
//! - **In-Memory** (fallback): No persistence, for testing or ephemeral runs
//!
//! ## Usage
//!
//! ```no_run
//! use probewatch::storage::{StorageBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./probewatch.db").await?;
//!     let devices = backend.list_enabled().await?;
//!     println!("{} enabled devices", devices.len());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
