use crate::monitor::MonitorState;
use siridb_monitor_collector::GroupOutcome;

/// Something worth reporting while the monitor runs.
#[derive(Debug)]
pub enum MonitorEvent<'a> {
    StateChanged {
        from: MonitorState,
        to: MonitorState,
    },
    GroupProvisioned {
        group: &'static str,
        outcome: &'a GroupOutcome,
    },
    BatchCollected {
        iteration: u64,
        timestamp: i64,
        series: usize,
    },
    BatchInserted {
        iteration: u64,
        series: usize,
        message: &'a str,
    },
}

pub trait MonitorSink: Send + Sync {
    fn report(&self, event: MonitorEvent<'_>);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MonitorSink for TracingSink {
    fn report(&self, event: MonitorEvent<'_>) {
        match event {
            MonitorEvent::StateChanged { from, to } => debug!(%from, %to, "state changed"),
            MonitorEvent::GroupProvisioned { group, outcome } => match outcome {
                GroupOutcome::Created => info!(group, "created group"),
                GroupOutcome::AlreadyExists => debug!(group, "group already exists"),
                GroupOutcome::Failed(err) => warn!(group, %err, "creating group failed"),
            },
            MonitorEvent::BatchCollected {
                iteration,
                timestamp,
                series,
            } => debug!(iteration, timestamp, series, "collected batch"),
            MonitorEvent::BatchInserted {
                iteration,
                series,
                message,
            } => info!(iteration, series, response = message, "inserted batch"),
        }
    }
}
