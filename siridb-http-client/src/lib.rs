//! Minimal client for the SiriDB HTTP API.
//!
//! Only what a metrics writer needs: running queries and inserting series,
//! spread over one or more servers of a cluster.

#[macro_use]
extern crate tracing;

mod cluster;
mod error;
mod http;
mod response;

pub use cluster::Cluster;
pub use error::{
    ClientError,
    QueryError,
};
pub use http::{
    ClusterOptions,
    HttpCluster,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use response::{
    InsertResponse,
    QueryResponse,
    SeriesCount,
    SeriesLengthCount,
    ServerList,
};
