use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::errors::{ClientBuildError, ServerError};

/// Interval between connection attempts while waiting for connectivity.
pub const CONNECTIVITY_POLL_INTERVAL: Duration = Duration::from_millis(500);

const MAX_MESSAGE_LEN: usize = 512;

/// Per-call transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallOptions {
    /// Overrides the client-wide timeout.
    pub timeout: Option<Duration>,
    /// Keep retrying the connection until `timeout` elapses instead of
    /// failing on the first connect error. Has no effect without a timeout.
    pub wait_for_connectivity: bool,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            wait_for_connectivity: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub options: CallOptions,
}

/// Status line and headers of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Success {
        body: Option<Bytes>,
        meta: ResponseMeta,
    },
    Failure(ServerError),
}

/// A low-level failure reported alongside a status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFault {
    pub code: i32,
    pub message: String,
}

/// Everything a round-trip produced, before interpretation.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub fault: Option<TransportFault>,
}

/// Maps a raw round-trip result to an [`Outcome`].
///
/// A non-200, non-500 status with a body and no fault becomes
/// `InvalidRequest` carrying the status code and the body text.
pub fn classify(raw: RawResponse) -> Outcome {
    let Some(status) = raw.status else {
        return Outcome::Failure(ServerError::NetworkProblem);
    };

    match status {
        // A fault after a 200 status line means the body never fully arrived.
        StatusCode::OK if raw.fault.is_some() => Outcome::Failure(ServerError::NetworkProblem),
        StatusCode::OK => Outcome::Success {
            body: raw.body,
            meta: ResponseMeta {
                status,
                headers: raw.headers,
            },
        },
        StatusCode::INTERNAL_SERVER_ERROR => Outcome::Failure(ServerError::ServerFail),
        _ => {
            if let Some(fault) = raw.fault {
                return Outcome::Failure(ServerError::InvalidRequest {
                    code: fault.code,
                    message: fault.message,
                });
            }
            match raw.body.filter(|body| !body.is_empty()) {
                Some(body) => Outcome::Failure(ServerError::InvalidRequest {
                    code: i32::from(status.as_u16()),
                    message: body_message(&body),
                }),
                None => Outcome::Failure(ServerError::ServerFail),
            }
        }
    }
}

fn body_message(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Performs exactly one HTTP call per invocation.
pub trait Transport: Send + Sync {
    fn call(&self, request: TransportRequest) -> impl Future<Output = Outcome> + Send;
}

/// reqwest-backed [`Transport`]. `max_connections_per_host` bounds the
/// in-flight calls of one transport and the idle pool size; it is not a
/// per-host limit across hosts.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    permits: Arc<Semaphore>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientBuildError> {
        let max_connections = config.max_connections_per_host.max(1);
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(max_connections);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(HttpTransport {
            http_client,
            permits: Arc::new(Semaphore::new(max_connections)),
        })
    }

    async fn round_trip(&self, request: &TransportRequest) -> RawResponse {
        let deadline = request.options.timeout.map(|timeout| Instant::now() + timeout);

        let response = loop {
            let mut builder = self
                .http_client
                .request(request.method.clone(), request.url.clone())
                .headers(request.headers.clone());
            if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }
            if let Some(deadline) = deadline {
                builder = builder.timeout(deadline.saturating_duration_since(Instant::now()));
            }

            match builder.send().await {
                Ok(response) => break response,
                Err(err) if err.is_connect() && self.should_wait(request, deadline) => {
                    debug!(error = %err, "no connectivity, waiting before next attempt");
                    tokio::time::sleep(CONNECTIVITY_POLL_INTERVAL).await;
                }
                Err(err) => {
                    // Connect and timeout errors land here with no status line.
                    warn!(error = %err, timeout = err.is_timeout(), "request did not complete");
                    return RawResponse {
                        status: err.status(),
                        fault: Some(TransportFault {
                            code: err.status().map_or(-1, |s| i32::from(s.as_u16())),
                            message: err.to_string(),
                        }),
                        ..RawResponse::default()
                    };
                }
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        match response.bytes().await {
            Ok(body) => RawResponse {
                status: Some(status),
                headers,
                body: Some(body),
                fault: None,
            },
            Err(err) => {
                warn!(error = %err, %status, timeout = err.is_timeout(), "failed to read response body");
                RawResponse {
                    // Expiry while reading the body is reported like any other timeout.
                    status: if err.is_timeout() { None } else { Some(status) },
                    headers,
                    body: None,
                    fault: Some(TransportFault {
                        code: i32::from(status.as_u16()),
                        message: err.to_string(),
                    }),
                }
            }
        }
    }

    fn should_wait(&self, request: &TransportRequest, deadline: Option<Instant>) -> bool {
        request.options.wait_for_connectivity
            && deadline.is_some_and(|d| Instant::now() + CONNECTIVITY_POLL_INTERVAL < d)
    }
}

impl Transport for HttpTransport {
    #[instrument(
        name = "transport_call",
        skip(self, request),
        fields(method = %request.method, url = %request.url)
    )]
    async fn call(&self, request: TransportRequest) -> Outcome {
        let Ok(_permit) = self.permits.acquire().await else {
            return Outcome::Failure(ServerError::NetworkProblem);
        };
        let raw = self.round_trip(&request).await;
        debug!(status = ?raw.status, "round-trip finished");
        let outcome = classify(raw);
        if let Outcome::Failure(kind) = &outcome {
            warn!(error = %kind, "call failed");
        }
        outcome
    }
}
