use clap::Parser;
use color_eyre::Result;
use eyre::Context as _;
use siridb_http_client::{
    ClusterOptions,
    HttpCluster,
    DEFAULT_REQUEST_TIMEOUT,
};
use siridb_monitor::{
    init_errors,
    init_logging,
    Monitor,
};
use siridb_monitor_collector::{
    Collector,
    DatabaseCollector,
    HostCollector,
    ProcfsProbe,
};
use siridb_monitor_config::{
    Args,
    Config,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = Config::new(args).wrap_err("Failed to load configuration")?;
    config.validate()?;
    let prefix = config.resolved_prefix()?;
    tracing::info!(database = %config.database, servers = %config.servers, %prefix, "starting monitor");

    let cluster = Arc::new(HttpCluster::new(ClusterOptions {
        username: config.user.clone(),
        password: config.password.clone(),
        database: config.database.clone(),
        servers: config
            .server_addresses()?
            .into_iter()
            .map(|address| (address.host, address.port))
            .collect(),
        request_timeout: DEFAULT_REQUEST_TIMEOUT,
    })?);

    let collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(HostCollector::from_config(
            prefix,
            Arc::new(ProcfsProbe),
            &config.samples,
            config.interval(),
        )?),
        Box::new(DatabaseCollector::new(cluster.clone(), config.database.clone())),
    ];

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received Ctrl-C, stopping after the current sample");
                shutdown.cancel();
            }
        }
    });

    let summary = Monitor::new(
        cluster,
        collectors,
        config.time_precision,
        config.interval(),
        config.sample_limit(),
    )
    .with_shutdown(shutdown)
    .run()
    .await?;

    tracing::info!(iterations = summary.iterations, series = summary.series_inserted, "done");
    Ok(())
}
