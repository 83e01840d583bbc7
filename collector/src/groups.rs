use crate::CollectError;
use siridb_http_client::{
    ClientError,
    Cluster,
};
use std::fmt;

/// A SiriDB group: every series matching `pattern` becomes a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group {
    pub name: &'static str,
    pub pattern: &'static str,
}

impl Group {
    pub const fn new(name: &'static str, pattern: &'static str) -> Self {
        Self { name, pattern }
    }

    pub fn statement(&self) -> String {
        format!("create group `{}` for /{}/", self.name, self.pattern)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub const GROUPS: &[Group] = &[
    Group::new("total_disk_usage_total", ".*total_disk_usage_total"),
    Group::new("total_disk_usage_used", ".*total_disk_usage_used"),
    Group::new("total_disk_usage_free", ".*total_disk_usage_free"),
    Group::new("total_cpu_percent", ".*total_cpu_percent"),
    Group::new("net_io_counters", ".*net_io_counters_(errin|errout).*"),
    Group::new("net_io_counters_bytes_sent", ".*_net_io_counters_bytes_sent"),
    Group::new("net_io_counters_bytes_recv", ".*_net_io_counters_bytes_recv"),
    Group::new("received", "siridb-server.*received_points"),
    Group::new("selected", "siridb-server.*selected_points"),
    Group::new("mem_usage", "siridb-server.*mem_usage"),
    Group::new("uptime", "siridb-server.*uptime"),
    Group::new("series", "siridb-database.*series"),
    Group::new("points", "siridb-database.*points"),
];

#[derive(Debug)]
pub enum GroupOutcome {
    Created,
    AlreadyExists,
    Failed(ClientError),
}

pub async fn create_group(cluster: &dyn Cluster, group: &Group) -> GroupOutcome {
    match cluster.query(&group.statement()).await {
        Ok(_) => GroupOutcome::Created,
        Err(err) if err.is_already_exists() => GroupOutcome::AlreadyExists,
        Err(err) => GroupOutcome::Failed(err),
    }
}

/// Creates `groups` in order. Groups that already exist are fine, any other
/// failure stops provisioning. Every outcome, the failing one included, is
/// handed to `on_outcome` as it happens.
#[instrument(skip_all, fields(groups = groups.len()))]
pub async fn provision(
    cluster: &dyn Cluster,
    groups: &[Group],
    mut on_outcome: impl FnMut(&'static str, &GroupOutcome) + Send,
) -> Result<Vec<(&'static str, GroupOutcome)>, CollectError> {
    let mut report = Vec::with_capacity(groups.len());
    for group in groups {
        let outcome = create_group(cluster, group).await;
        debug!(group = group.name, ?outcome, "Provisioned group");
        on_outcome(group.name, &outcome);
        if let GroupOutcome::Failed(source) = outcome {
            return Err(CollectError::Provision {
                group: group.name,
                source,
            });
        }
        report.push((group.name, outcome));
    }
    Ok(report)
}
