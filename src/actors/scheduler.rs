//! SchedulerActor - Drives probes for every enabled device
//!
//! On each tick the actor reads the enabled devices, picks the ones whose
//! interval has elapsed and spawns one probe task per due device. Each task
//! commits its outcome to the store as a single atomic update + log append.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → list_enabled → due check → in-flight guard → probe task
//!     ↑                                                        │
//!     └─── Commands (TickNow, Shutdown)         commit_outcome ◄┘
//! ```
//!
//! Probe tasks live in a `JoinSet` owned by the actor, so a panicking probe
//! is reported instead of vanishing, and shutdown can wait for in-flight
//! commits to land.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::device::{Device, LogEntry};
use crate::probes::ProbeExecutor;
use crate::storage::{StorageBackend, StorageResult};

use super::in_flight::{InFlightGuard, InFlightRegistry};
use super::messages::{SchedulerCommand, TickReport};

/// Default period between ticks
pub const DEFAULT_TICK: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Period of the discovery timer, independent of device intervals
    pub tick: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self { tick: DEFAULT_TICK }
    }
}

/// Devices that should be probed at `now`
///
/// Disabled devices are never due, whatever their schedule says.
pub fn due_devices(devices: Vec<Device>, now: DateTime<Utc>) -> Vec<Device> {
    devices
        .into_iter()
        .filter(|device| {
            let due = device.enabled && device.is_due(now);
            trace!(device = %device.id, due, "due check");
            due
        })
        .collect()
}

/// Actor that schedules and dispatches probes
pub struct SchedulerActor {
    store: Arc<dyn StorageBackend>,

    executor: Arc<ProbeExecutor>,

    settings: SchedulerSettings,

    /// Devices with a probe currently running
    in_flight: InFlightRegistry,

    /// Running probe tasks
    tasks: JoinSet<()>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl SchedulerActor {
    pub fn new(
        store: Arc<dyn StorageBackend>,
        executor: Arc<ProbeExecutor>,
        settings: SchedulerSettings,
        in_flight: InFlightRegistry,
        command_rx: mpsc::Receiver<SchedulerCommand>,
    ) -> Self {
        Self {
            store,
            executor,
            settings,
            in_flight,
            tasks: JoinSet::new(),
            command_rx,
        }
    }

    /// Run the actor's main loop
    ///
    /// This runs until:
    /// - A Shutdown command is received
    /// - The command channel is closed
    ///
    /// In both cases the actor waits for in-flight probes before returning.
    #[instrument(skip(self), fields(tick_ms = self.settings.tick.as_millis() as u64))]
    pub async fn run(mut self) {
        info!("starting scheduler");

        let mut ticker = interval(self.settings.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Timer tick - dispatch due devices
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("failed to list enabled devices: {}", e);
                    }
                }

                // Handle commands
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::TickNow { respond_to }) => {
                            debug!("received TickNow command");
                            let result = self.tick().await;
                            let _ = respond_to.send(result);
                        }

                        Some(SchedulerCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }

                // Reap finished probe tasks
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    Self::reap(joined);
                }
            }
        }

        if !self.tasks.is_empty() {
            info!("waiting for {} in-flight probes", self.tasks.len());
        }
        while let Some(joined) = self.tasks.join_next().await {
            Self::reap(joined);
        }

        info!("scheduler stopped");
    }

    /// One pass over the enabled devices
    ///
    /// Only the listing can fail; probe and commit failures are handled
    /// inside the probe tasks.
    async fn tick(&mut self) -> StorageResult<TickReport> {
        let now = Utc::now();
        let devices = self.store.list_enabled().await?;

        let mut report = TickReport {
            enabled: devices.len(),
            ..TickReport::default()
        };

        for device in due_devices(devices, now) {
            report.due += 1;

            let Some(guard) = self.in_flight.try_acquire(&device.id) else {
                debug!(device = %device.id, "previous probe still running, skipping");
                report.skipped_in_flight += 1;
                continue;
            };

            debug!(device = %device.id, request_type = %device.check.probe.request_type(), "dispatching probe");
            report.dispatched += 1;
            self.tasks.spawn(run_probe(
                Arc::clone(&self.store),
                Arc::clone(&self.executor),
                device,
                guard,
            ));
        }

        if report.dispatched > 0 {
            trace!(?report, "tick complete");
        }
        Ok(report)
    }

    fn reap(joined: Result<(), JoinError>) {
        match joined {
            Ok(()) => {}
            Err(e) if e.is_panic() => error!("probe task panicked: {}", e),
            Err(e) => debug!("probe task cancelled: {}", e),
        }
    }
}

/// Probe one device and commit the outcome
///
/// The guard is held until the commit finishes, so a device's log entries
/// are written in order.
#[instrument(skip_all, fields(device = %device.id))]
async fn run_probe(
    store: Arc<dyn StorageBackend>,
    executor: Arc<ProbeExecutor>,
    device: Device,
    _guard: InFlightGuard,
) {
    let outcome = executor
        .execute_or_fail(&device.check.probe, &device.check.matchers)
        .await;

    let entry = LogEntry::from_outcome(&device.id, Utc::now(), &outcome);
    match store.commit_outcome(&entry).await {
        Ok(()) => debug!(ok = outcome.ok, elapsed_ms = outcome.elapsed_ms, "outcome committed"),
        Err(e) => error!("failed to commit outcome for device {}: {}", device.id, e),
    }
}

/// Handle for controlling a SchedulerActor
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
    in_flight: InFlightRegistry,
}

impl SchedulerHandle {
    /// Spawn a new scheduler actor
    ///
    /// The returned `JoinHandle` finishes only when the scheduler stops;
    /// the hub treats an unrequested finish as fatal.
    pub fn spawn(
        store: Arc<dyn StorageBackend>,
        executor: Arc<ProbeExecutor>,
        settings: SchedulerSettings,
    ) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let in_flight = InFlightRegistry::new();

        let actor = SchedulerActor::new(store, executor, settings, in_flight.clone(), cmd_rx);
        let task = tokio::spawn(actor.run());

        (
            Self {
                sender: cmd_tx,
                in_flight,
            },
            task,
        )
    }

    /// Trigger an immediate tick
    pub async fn tick_now(&self) -> Result<TickReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::TickNow { respond_to: tx })
            .await?;

        Ok(rx.await??)
    }

    /// Number of probes currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Shut down the scheduler
    pub async fn shutdown(self) {
        let _ = self.sender.send(SchedulerCommand::Shutdown).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
