use crate::{
    ClientError,
    InsertResponse,
    QueryResponse,
};
use futures::future::BoxFuture;

/// A connection to a SiriDB cluster.
///
/// `connect` must succeed before `query` or `insert` are used, `close` is
/// idempotent and makes every later call fail with [`ClientError::Closed`].
pub trait Cluster: Send + Sync {
    fn connect(&self) -> BoxFuture<'_, Result<(), ClientError>>;

    fn query<'a>(&'a self, statement: &'a str) -> BoxFuture<'a, Result<QueryResponse, ClientError>>;

    /// Inserts `{"series name": [[ts, value], ...], ...}`.
    fn insert<'a>(&'a self, series: &'a serde_json::Value) -> BoxFuture<'a, Result<InsertResponse, ClientError>>;

    fn close(&self) -> BoxFuture<'_, ()>;
}
