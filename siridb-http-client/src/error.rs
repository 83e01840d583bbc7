/// An error reported by SiriDB itself, e.g. a malformed query or a group
/// that already exists.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("SiriDB rejected the request ({status}): {message}")]
pub struct QueryError {
    pub status: u16,
    pub message: String,
}

impl QueryError {
    pub fn is_already_exists(&self) -> bool {
        self.message.contains("already exists")
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("The client is not connected")]
    NotConnected,
    #[error("The client has been closed")]
    Closed,
    #[error("None of the configured SiriDB servers is reachable")]
    NoServerAvailable,
    #[error("Request to {server} failed: {source}")]
    Transport {
        server: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{server} rejected the credentials: {message}")]
    Unauthorized { server: String, message: String },
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("Unexpected response from SiriDB: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClientError::Query(err) if err.is_already_exists())
    }
}
