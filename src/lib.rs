//! Recurring HTTP/TCP/UDP health probes for user-defined devices
//!
//! A [`actors::SchedulerHandle`] ticks once per second, picks the enabled
//! devices whose interval has elapsed and runs their probes through a
//! [`probes::ProbeExecutor`]. Each outcome is classified with the device's
//! matcher rules ([`matcher::classify`]) and committed to the
//! [`storage::StorageBackend`] as one atomic status update + log append.

pub mod actors;
pub mod api;
pub mod config;
pub mod device;
pub mod matcher;
pub mod probes;
pub mod storage;
pub mod util;

pub use device::{
    CheckDefinition, Device, LogEntry, MatcherRule, ProbeOutcome, ProbeRequest, ProbeSpec,
    Schedule, Template, TimeUnit,
};
