//! Short and long poll cadences over all registered nodes.
//!
//! Each tick first looks at the discovery run state and skips entirely while
//! a run is active, so polling never walks a registry that is being extended.

use crate::discovery::DiscoveryEngine;
use crate::registry::Registry;
use crate::report::Report;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Discovery was running; nothing was touched.
    Skipped,
    /// Number of nodes visited.
    Polled(usize),
}

#[derive(Clone)]
pub struct PollingScheduler {
    registry: Arc<Registry>,
    discovery: Arc<DiscoveryEngine>,
    reports: broadcast::Sender<Report>,
}

impl PollingScheduler {
    pub fn new(
        registry: Arc<Registry>,
        discovery: Arc<DiscoveryEngine>,
        reports: broadcast::Sender<Report>,
    ) -> Self {
        Self {
            registry,
            discovery,
            reports,
        }
    }

    /// Refreshes every node in registry order and publishes its drivers.
    pub async fn short_poll(&self) -> PollOutcome {
        if self.discovery.in_progress() {
            debug!("Skipping shortPoll() while discovery in progress...");
            return PollOutcome::Skipped;
        }

        let nodes = self.registry.snapshot().await;
        for (id, node) in &nodes {
            let mut node = node.lock().await;
            node.refresh().await;
            let _ = self.reports.send(Report::Drivers {
                address: id.clone(),
                values: node.report(),
            });
        }
        info!("shortPoll: refreshed {} nodes", nodes.len());
        PollOutcome::Polled(nodes.len())
    }

    /// Runs the long-cycle heartbeat on every node.
    pub async fn long_poll(&self) -> PollOutcome {
        if self.discovery.in_progress() {
            debug!("Skipping longPoll() while discovery in progress...");
            return PollOutcome::Skipped;
        }

        let nodes = self.registry.snapshot().await;
        for (_, node) in &nodes {
            node.lock().await.heartbeat();
        }
        info!("longPoll: heartbeat on {} nodes", nodes.len());
        PollOutcome::Polled(nodes.len())
    }

    /// Drives both cadences until `cancel` fires. Late ticks are skipped, not
    /// bunched up.
    pub async fn run(&self, short: Duration, long: Duration, cancel: CancellationToken) {
        let mut short_tick = interval(short);
        short_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut long_tick = interval(long);
        long_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Polling started (short {:?}, long {:?})", short, long);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = short_tick.tick() => {
                    self.short_poll().await;
                }
                _ = long_tick.tick() => {
                    self.long_poll().await;
                }
            }
        }
        info!("Polling stopped");
    }
}
