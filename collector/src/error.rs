use crate::probe::ProbeError;
use siridb_http_client::ClientError;
use siridb_monitor_config::MetricSource;

#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    #[error("Reading host metrics failed: {0}")]
    Probe(#[from] ProbeError),
    #[error("SiriDB request failed: {0}")]
    Client(#[from] ClientError),
    #[error("Series {0:?} is already part of this batch")]
    DuplicateSeries(String),
    #[error("{metric} has no attribute {attribute:?}")]
    UnknownAttribute { metric: MetricSource, attribute: String },
    #[error("{metric} returns plain numbers, properties cannot be extracted from them")]
    PropertiesOnScalar { metric: MetricSource },
    #[error("{metric} returns records, at least one property must be selected")]
    MissingProperties { metric: MetricSource },
    #[error("{metric} requires a path")]
    MissingPath { metric: MetricSource },
    #[error("Reading of {metric} lacks attribute {attribute:?}")]
    MissingAttribute { metric: MetricSource, attribute: &'static str },
    #[error("Series {series:?} got a non numeric value: {value}")]
    UnexpectedValue { series: String, value: serde_json::Value },
    #[error("Creating group {group:?} failed: {source}")]
    Provision {
        group: &'static str,
        #[source]
        source: ClientError,
    },
    #[error("Encoding the batch failed: {0}")]
    Encode(#[from] serde_json::Error),
}
