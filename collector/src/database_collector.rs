use crate::{
    collector::Collector,
    Batch,
    CollectError,
    Value,
};
use siridb_http_client::{
    Cluster,
    SeriesCount,
    SeriesLengthCount,
    ServerList,
};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
};

/// Leading part of every series written about SiriDB itself.
pub const SERIES_NAMESPACE: &str = "siridb";

pub const LIST_SERVERS: &str = "list servers name, mem_usage, received_points, selected_points, uptime";
pub const COUNT_SERIES: &str = "count series";
pub const COUNT_SERIES_LENGTH: &str = "count series length";

pub fn server_series_name(server: &str, column: &str) -> String {
    format!("{SERIES_NAMESPACE}-server-{server}-{column}")
}

pub fn database_series_name(database: &str, metric: &str) -> String {
    format!("{SERIES_NAMESPACE}-database-{database}-{metric}")
}

/// Collects the administrative state of the cluster it writes to.
pub struct DatabaseCollector {
    cluster: Arc<dyn Cluster>,
    database: String,
}

impl DatabaseCollector {
    pub fn new(cluster: Arc<dyn Cluster>, database: impl Into<String>) -> Self {
        Self {
            cluster,
            database: database.into(),
        }
    }

    /// One series per server and column, the first column is the server name.
    async fn collect_servers(&self, batch: &mut Batch) -> Result<(), CollectError> {
        let list: ServerList = self.cluster.query(LIST_SERVERS).await?.decode()?;
        for row in &list.servers {
            let Some(name) = row.first() else {
                continue;
            };
            let name = match name.as_str() {
                Some(name) => name.to_string(),
                None => name.to_string(),
            };
            for (column, cell) in list.columns.iter().zip(row.iter()).skip(1) {
                let series = server_series_name(&name, column);
                let value = Value::try_from(cell).map_err(|_| CollectError::UnexpectedValue {
                    series: series.clone(),
                    value: cell.clone(),
                })?;
                batch.push(series, value)?;
            }
        }
        Ok(())
    }

    async fn collect_counts(&self, batch: &mut Batch) -> Result<(), CollectError> {
        let count: SeriesCount = self.cluster.query(COUNT_SERIES).await?.decode()?;
        batch.push(database_series_name(&self.database, "series"), count.series)?;

        let length: SeriesLengthCount = self.cluster.query(COUNT_SERIES_LENGTH).await?.decode()?;
        batch.push(database_series_name(&self.database, "points"), length.series_length)?;
        Ok(())
    }
}

impl Collector for DatabaseCollector {
    fn collect<'a>(&'a self, batch: &'a mut Batch) -> Pin<Box<dyn Future<Output = Result<usize, CollectError>> + Send + 'a>> {
        Box::pin(async move {
            let before = batch.len();
            self.collect_servers(batch).await?;
            self.collect_counts(batch).await?;
            Ok(batch.len() - before)
        })
    }

    fn name(&self) -> &'static str {
        "database"
    }
}
