use crate::sink::{
    MonitorEvent,
    MonitorSink,
    TracingSink,
};
use siridb_http_client::Cluster;
use siridb_monitor_collector::{
    provision,
    Batch,
    CollectError,
    Collector,
    Group,
    GROUPS,
};
use siridb_monitor_config::TimePrecision;
use std::{
    sync::Arc,
    time::Duration,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorState {
    Init,
    Connecting,
    Provisioning,
    Sampling,
    Stopped,
    Closing,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub series_inserted: u64,
}

/// Samples every collector into one batch per interval and writes it to the
/// cluster. The cluster is closed exactly once, however the run ends.
pub struct Monitor {
    cluster: Arc<dyn Cluster>,
    collectors: Vec<Box<dyn Collector>>,
    groups: &'static [Group],
    precision: TimePrecision,
    interval: Duration,
    limit: Option<u64>,
    sink: Arc<dyn MonitorSink>,
    shutdown: CancellationToken,
    state: MonitorState,
}

impl Monitor {
    /// `limit` of `None` samples until shut down.
    pub fn new(
        cluster: Arc<dyn Cluster>,
        collectors: Vec<Box<dyn Collector>>,
        precision: TimePrecision,
        interval: Duration,
        limit: Option<u64>,
    ) -> Self {
        Self {
            cluster,
            collectors,
            groups: GROUPS,
            precision,
            interval,
            limit,
            sink: Arc::new(TracingSink),
            shutdown: CancellationToken::new(),
            state: MonitorState::Init,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn MonitorSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_groups(mut self, groups: &'static [Group]) -> Self {
        self.groups = groups;
        self
    }

    /// Cancelling the token stops the monitor once the current sample is written.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub async fn run(mut self) -> Result<RunSummary, CollectError> {
        let mut summary = RunSummary::default();
        let result = self.drive(&mut summary).await;

        self.transition(MonitorState::Closing);
        self.cluster.close().await;

        match result {
            Ok(()) => {
                info!(iterations = summary.iterations, series = summary.series_inserted, "monitor finished");
                Ok(summary)
            }
            Err(err) => {
                error!(%err, iterations = summary.iterations, "monitor failed");
                Err(err)
            }
        }
    }

    async fn drive(&mut self, summary: &mut RunSummary) -> Result<(), CollectError> {
        self.transition(MonitorState::Connecting);
        self.cluster.connect().await?;

        self.transition(MonitorState::Provisioning);
        let sink = &self.sink;
        provision(self.cluster.as_ref(), self.groups, |group, outcome| {
            sink.report(MonitorEvent::GroupProvisioned { group, outcome });
        })
        .await?;

        self.transition(MonitorState::Sampling);
        let mut remaining = self.limit;
        while remaining != Some(0) {
            summary.iterations += 1;
            summary.series_inserted += self.sample(summary.iterations).await? as u64;

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            if let Some(remaining) = remaining.as_mut() {
                *remaining -= 1;
            }
        }

        self.transition(MonitorState::Stopped);
        Ok(())
    }

    /// One iteration: a single timestamp shared by every collector, then one insert.
    async fn sample(&self, iteration: u64) -> Result<usize, CollectError> {
        let mut batch = Batch::new(self.precision.now());
        for collector in &self.collectors {
            let added = collector.collect(&mut batch).await?;
            trace!(collector = collector.name(), added, "collected");
        }
        self.sink.report(MonitorEvent::BatchCollected {
            iteration,
            timestamp: batch.timestamp(),
            series: batch.len(),
        });

        let response = self.cluster.insert(&batch.to_json()?).await?;
        self.sink.report(MonitorEvent::BatchInserted {
            iteration,
            series: batch.len(),
            message: &response.success_msg,
        });
        Ok(batch.len())
    }

    fn transition(&mut self, to: MonitorState) {
        let from = std::mem::replace(&mut self.state, to);
        self.sink.report(MonitorEvent::StateChanged { from, to });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::future::BoxFuture;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use siridb_http_client::{
        ClientError,
        InsertResponse,
        QueryError,
        QueryResponse,
    };
    use siridb_monitor_collector::GroupOutcome;
    use std::sync::{
        atomic::{
            AtomicU64,
            AtomicUsize,
            Ordering,
        },
        Mutex,
    };

    #[derive(Default)]
    struct FakeCluster {
        fail_connect: bool,
        fail_queries: bool,
        fail_insert: bool,
        inserted: Mutex<Vec<serde_json::Value>>,
        closed: AtomicUsize,
    }

    impl Cluster for FakeCluster {
        fn connect(&self) -> BoxFuture<'_, Result<(), ClientError>> {
            Box::pin(async move {
                if self.fail_connect {
                    Err(ClientError::NoServerAvailable)
                } else {
                    Ok(())
                }
            })
        }

        fn query<'a>(&'a self, _statement: &'a str) -> BoxFuture<'a, Result<QueryResponse, ClientError>> {
            Box::pin(async move {
                if self.fail_queries {
                    return Err(QueryError {
                        status: 500,
                        message: "query failed".to_string(),
                    }
                    .into());
                }
                Ok(QueryResponse::new(json!({"success_msg": "ok"})))
            })
        }

        fn insert<'a>(&'a self, series: &'a serde_json::Value) -> BoxFuture<'a, Result<InsertResponse, ClientError>> {
            Box::pin(async move {
                if self.fail_insert {
                    return Err(QueryError {
                        status: 500,
                        message: "insert failed".to_string(),
                    }
                    .into());
                }
                self.inserted.lock().unwrap().push(series.clone());
                Ok(InsertResponse {
                    success_msg: "Successfully inserted".to_string(),
                })
            })
        }

        fn close(&self) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                self.closed.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    /// Pushes `{name}` with a value counting the iterations.
    struct CountingCollector {
        name: &'static str,
        calls: AtomicU64,
    }

    impl CountingCollector {
        fn boxed(name: &'static str) -> Box<dyn Collector> {
            Box::new(Self {
                name,
                calls: AtomicU64::new(0),
            })
        }
    }

    impl Collector for CountingCollector {
        fn collect<'a>(
            &'a self,
            batch: &'a mut Batch,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<usize, CollectError>> + Send + 'a>> {
            Box::pin(async move {
                let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                batch.push(self.name, calls)?;
                Ok(1)
            })
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        states: Mutex<Vec<MonitorState>>,
        groups: AtomicUsize,
        failed_groups: Mutex<Vec<&'static str>>,
    }

    impl MonitorSink for RecordingSink {
        fn report(&self, event: MonitorEvent<'_>) {
            match event {
                MonitorEvent::StateChanged { to, .. } => self.states.lock().unwrap().push(to),
                MonitorEvent::GroupProvisioned { group, outcome } => {
                    self.groups.fetch_add(1, Ordering::SeqCst);
                    if matches!(outcome, GroupOutcome::Failed(_)) {
                        self.failed_groups.lock().unwrap().push(group);
                    }
                }
                _ => {}
            }
        }
    }

    fn monitor(cluster: Arc<FakeCluster>, sink: Arc<RecordingSink>, limit: Option<u64>) -> Monitor {
        Monitor::new(
            cluster,
            vec![CountingCollector::boxed("host"), CountingCollector::boxed("database")],
            TimePrecision::Seconds,
            Duration::from_secs(5),
            limit,
        )
        .with_sink(sink)
    }

    #[tokio::test(start_paused = true)]
    async fn finite_run_inserts_each_sample_then_closes() {
        let cluster = Arc::new(FakeCluster::default());
        let sink = Arc::new(RecordingSink::default());

        let summary = monitor(cluster.clone(), sink.clone(), Some(3)).run().await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                iterations: 3,
                series_inserted: 6,
            }
        );
        assert_eq!(cluster.inserted.lock().unwrap().len(), 3);
        assert_eq!(cluster.closed.load(Ordering::SeqCst), 1);
        assert_eq!(sink.groups.load(Ordering::SeqCst), GROUPS.len());
        assert_eq!(
            *sink.states.lock().unwrap(),
            vec![
                MonitorState::Connecting,
                MonitorState::Provisioning,
                MonitorState::Sampling,
                MonitorState::Stopped,
                MonitorState::Closing,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn every_series_of_a_batch_shares_the_timestamp() {
        let cluster = Arc::new(FakeCluster::default());
        monitor(cluster.clone(), Arc::default(), Some(2)).run().await.unwrap();

        for payload in cluster.inserted.lock().unwrap().iter() {
            let host = &payload["host"][0];
            let database = &payload["database"][0];
            assert_eq!(host[0], database[0]);
            assert_eq!(payload.as_object().unwrap().len(), 2);
        }
        let last = cluster.inserted.lock().unwrap()[1].clone();
        assert_eq!(last["host"][0][1], json!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_insert_still_closes() {
        let cluster = Arc::new(FakeCluster {
            fail_insert: true,
            ..Default::default()
        });
        let sink = Arc::new(RecordingSink::default());

        let result = monitor(cluster.clone(), sink.clone(), Some(3)).run().await;

        assert!(matches!(result, Err(CollectError::Client(ClientError::Query(_)))));
        assert_eq!(cluster.closed.load(Ordering::SeqCst), 1);
        assert_eq!(sink.states.lock().unwrap().last(), Some(&MonitorState::Closing));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connect_skips_to_closing() {
        let cluster = Arc::new(FakeCluster {
            fail_connect: true,
            ..Default::default()
        });
        let sink = Arc::new(RecordingSink::default());

        let result = monitor(cluster.clone(), sink.clone(), None).run().await;

        assert!(matches!(result, Err(CollectError::Client(ClientError::NoServerAvailable))));
        assert_eq!(cluster.closed.load(Ordering::SeqCst), 1);
        assert_eq!(
            *sink.states.lock().unwrap(),
            vec![MonitorState::Connecting, MonitorState::Closing]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_group_is_reported_before_closing() {
        let cluster = Arc::new(FakeCluster {
            fail_queries: true,
            ..Default::default()
        });
        let sink = Arc::new(RecordingSink::default());

        let result = monitor(cluster.clone(), sink.clone(), Some(1)).run().await;

        assert!(matches!(
            result,
            Err(CollectError::Provision {
                group: "total_disk_usage_total",
                ..
            })
        ));
        assert_eq!(*sink.failed_groups.lock().unwrap(), vec!["total_disk_usage_total"]);
        assert_eq!(cluster.inserted.lock().unwrap().len(), 0);
        assert_eq!(cluster.closed.load(Ordering::SeqCst), 1);
        assert_eq!(
            *sink.states.lock().unwrap(),
            vec![MonitorState::Connecting, MonitorState::Provisioning, MonitorState::Closing]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_finishes_the_current_sample() {
        let cluster = Arc::new(FakeCluster::default());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let summary = monitor(cluster.clone(), Arc::default(), None)
            .with_shutdown(shutdown)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.iterations, 1);
        assert_eq!(cluster.inserted.lock().unwrap().len(), 1);
        assert_eq!(cluster.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_samples_means_until_shutdown() {
        let cluster = Arc::new(FakeCluster::default());
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            monitor(cluster.clone(), Arc::default(), None)
                .with_shutdown(shutdown.clone())
                .run(),
        );

        tokio::time::sleep(Duration::from_secs(5 * 10 + 1)).await;
        shutdown.cancel();
        let summary = handle.await.unwrap().unwrap();

        assert!(summary.iterations >= 10);
        assert_eq!(cluster.closed.load(Ordering::SeqCst), 1);
    }
}
