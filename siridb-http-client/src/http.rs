use crate::{
    response::ErrorBody,
    ClientError,
    Cluster,
    InsertResponse,
    QueryError,
    QueryResponse,
};
use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::{
    sync::atomic::{
        AtomicBool,
        AtomicUsize,
        Ordering,
    },
    time::Duration,
};
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClusterOptions {
    pub username: String,
    pub password: String,
    pub database: String,
    /// `(host, port)` of every HTTP API endpoint.
    pub servers: Vec<(String, u16)>,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
enum Route {
    Query,
    Insert,
}

impl Route {
    fn as_str(&self) -> &'static str {
        match self {
            Route::Query => "query",
            Route::Insert => "insert",
        }
    }
}

#[derive(Debug)]
struct Server {
    name: String,
    base_url: Url,
    available: AtomicBool,
}

/// [`Cluster`] on top of the SiriDB HTTP API.
///
/// Requests rotate over the servers. A server that cannot be reached is
/// marked unavailable and the request moves on to the next one; SiriDB
/// errors are returned as they are.
#[derive(Debug)]
pub struct HttpCluster {
    http: reqwest::Client,
    username: String,
    password: String,
    database: String,
    servers: Vec<Server>,
    cursor: AtomicUsize,
    connected: AtomicBool,
    closed: AtomicBool,
}

impl HttpCluster {
    pub fn new(options: ClusterOptions) -> Result<Self, ClientError> {
        let servers = options
            .servers
            .iter()
            .map(|(host, port)| {
                let name = if host.contains(':') {
                    format!("[{host}]:{port}")
                } else {
                    format!("{host}:{port}")
                };
                Ok(Server {
                    base_url: Url::parse(&format!("http://{name}/"))?,
                    name,
                    available: AtomicBool::new(false),
                })
            })
            .collect::<Result<Vec<_>, ClientError>>()?;

        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                server: "<client>".to_string(),
                source,
            })?;

        Ok(Self {
            http,
            username: options.username,
            password: options.password,
            database: options.database,
            servers,
            cursor: AtomicUsize::new(0),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn ensure_open(&self) -> Result<(), ClientError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed);
        }
        if !self.connected.load(Ordering::Acquire) {
            return Err(ClientError::NotConnected);
        }
        Ok(())
    }

    /// Server indices in the order they should be tried: round-robin over the
    /// available ones, followed by those that failed before.
    fn candidates(&self) -> Vec<usize> {
        let n = self.servers.len();
        if n == 0 {
            return Vec::new();
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % n;
        let (mut available, unavailable): (Vec<usize>, Vec<usize>) = (0..n)
            .map(|offset| (start + offset) % n)
            .partition(|&idx| self.servers[idx].available.load(Ordering::Relaxed));
        available.extend(unavailable);
        available
    }

    async fn send<T: DeserializeOwned>(&self, route: Route, body: &serde_json::Value) -> Result<T, ClientError> {
        self.ensure_open()?;
        for idx in self.candidates() {
            let server = &self.servers[idx];
            match self.post(server, route, body).await {
                Ok(value) => {
                    server.available.store(true, Ordering::Relaxed);
                    return Ok(value);
                }
                Err(err @ ClientError::Transport { .. }) => {
                    warn!(server = %server.name, "{err}, trying the next server");
                    server.available.store(false, Ordering::Relaxed);
                }
                Err(err) => return Err(err),
            }
        }
        Err(ClientError::NoServerAvailable)
    }

    #[instrument(level = "debug", skip(self, server, route, body), fields(server = %server.name, route = route.as_str()))]
    async fn post<T: DeserializeOwned>(
        &self,
        server: &Server,
        route: Route,
        body: &serde_json::Value,
    ) -> Result<T, ClientError> {
        let transport = |source| ClientError::Transport {
            server: server.name.clone(),
            source,
        };

        let url = server
            .base_url
            .join(&format!("{}/{}", route.as_str(), self.database))?;
        let response = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        trace!(%status, body = %text, "response");

        if status.is_success() {
            return Ok(serde_json::from_str(&text)?);
        }

        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|ea| ea.error_msg)
            .unwrap_or(text);
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::Unauthorized {
                server: server.name.clone(),
                message,
            });
        }
        Err(QueryError {
            status: status.as_u16(),
            message,
        }
        .into())
    }

    async fn connect_inner(&self) -> Result<(), ClientError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed);
        }
        let probe = serde_json::json!({ "q": "show version" });
        let mut reachable = 0;
        for server in &self.servers {
            match self.post::<serde_json::Value>(server, Route::Query, &probe).await {
                Ok(_) => {
                    info!(server = %server.name, database = %self.database, "connected");
                    server.available.store(true, Ordering::Relaxed);
                    reachable += 1;
                }
                Err(err @ ClientError::Unauthorized { .. }) => return Err(err),
                Err(err) => {
                    warn!(server = %server.name, "server not available: {err}");
                    server.available.store(false, Ordering::Relaxed);
                }
            }
        }
        if reachable == 0 {
            return Err(ClientError::NoServerAvailable);
        }
        self.connected.store(true, Ordering::Release);
        Ok(())
    }
}

impl Cluster for HttpCluster {
    fn connect(&self) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(self.connect_inner())
    }

    fn query<'a>(&'a self, statement: &'a str) -> BoxFuture<'a, Result<QueryResponse, ClientError>> {
        Box::pin(async move {
            debug!(statement, "query");
            let body = serde_json::json!({ "q": statement });
            let value: serde_json::Value = self.send(Route::Query, &body).await?;
            Ok(QueryResponse::new(value))
        })
    }

    fn insert<'a>(&'a self, series: &'a serde_json::Value) -> BoxFuture<'a, Result<InsertResponse, ClientError>> {
        Box::pin(self.send(Route::Insert, series))
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.closed.swap(true, Ordering::AcqRel) {
                self.connected.store(false, Ordering::Release);
                for server in &self.servers {
                    server.available.store(false, Ordering::Relaxed);
                }
                debug!(database = %self.database, "connection closed");
            }
        })
    }
}
