use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::dispatch::{MainDispatcher, RequestHandle};
use crate::endpoint::{Empty, Endpoint, QueryItem};
use crate::errors::{ClientBuildError, EndpointClientError};
use crate::transport::{
    CallOptions, HttpTransport, Outcome, ResponseMeta, Transport, TransportRequest,
};

/// Typed result of one call plus the response metadata, when a response
/// was received.
#[derive(Debug)]
pub struct Completion<T> {
    pub result: Result<T, EndpointClientError>,
    pub response: Option<ResponseMeta>,
}

impl<T> Completion<T> {
    fn failed(error: EndpointClientError) -> Self {
        Completion {
            result: Err(error),
            response: None,
        }
    }

    pub fn into_result(self) -> Result<T, EndpointClientError> {
        self.result
    }
}

pub struct EndpointClient<T = HttpTransport> {
    config: Arc<ClientConfig>,
    transport: Arc<T>,
}

impl EndpointClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> Result<Self, ClientBuildError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> EndpointClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        EndpointClient {
            config: Arc::new(config),
            transport: Arc::new(transport),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Base URL with `path` appended as path segments and `query_items`
    /// replacing any existing query.
    pub fn build_url(
        &self,
        path: &str,
        query_items: Option<&[QueryItem]>,
    ) -> Result<Url, EndpointClientError> {
        let mut url = Url::parse(&self.config.base_url).map_err(|err| {
            warn!(base_url = %self.config.base_url, error = %err, "invalid base URL");
            EndpointClientError::WrongUrl
        })?;

        if !path.is_empty() {
            url.path_segments_mut()
                .map_err(|_| EndpointClientError::WrongUrl)?
                .pop_if_empty()
                .extend(path.split('/').filter(|segment| !segment.is_empty()));
        }

        if let Some(items) = query_items {
            // Percent-encoded rather than form-encoded: a space is `%20`, never `+`.
            let query = items
                .iter()
                .map(|item| {
                    format!(
                        "{}={}",
                        urlencoding::encode(&item.name),
                        urlencoding::encode(&item.value)
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }

        Ok(url)
    }

    /// Executes an endpoint expecting a decodable payload.
    #[instrument(
        name = "execute_typed",
        skip(self, endpoint),
        fields(method = %endpoint.method(), path = %endpoint.path())
    )]
    pub async fn execute_typed<R>(&self, endpoint: &Endpoint<R>) -> Completion<R>
    where
        R: DeserializeOwned,
    {
        match self.perform(endpoint).await {
            Ok(Outcome::Success { body, meta }) => Completion {
                result: decode(body.as_ref()),
                response: Some(meta),
            },
            Ok(Outcome::Failure(kind)) => Completion::failed(kind.into()),
            Err(err) => Completion::failed(err),
        }
    }

    /// Executes an endpoint expecting no payload.
    #[instrument(
        name = "execute_empty",
        skip(self, endpoint),
        fields(method = %endpoint.method(), path = %endpoint.path())
    )]
    pub async fn execute_empty(
        &self,
        endpoint: &Endpoint<Empty>,
    ) -> Result<(), EndpointClientError> {
        match self.perform(endpoint).await? {
            Outcome::Success { .. } => Ok(()),
            Outcome::Failure(kind) => Err(kind.into()),
        }
    }

    async fn perform<R>(&self, endpoint: &Endpoint<R>) -> Result<Outcome, EndpointClientError> {
        let url = self.build_url(endpoint.path(), endpoint.query_items())?;
        let body = endpoint.body()?.map(Bytes::from);
        let options = match endpoint.request_timeout() {
            Some(timeout) => CallOptions::with_timeout(timeout),
            None => CallOptions::default(),
        };

        debug!(%url, has_body = body.is_some(), ?options, "sending request");
        let request = TransportRequest {
            method: endpoint.method().into(),
            url,
            headers: endpoint.headers(),
            body,
            options,
        };
        Ok(self.transport.call(request).await)
    }
}

impl<T: Transport + 'static> EndpointClient<T> {
    /// Runs [`Self::execute_typed`] on the tokio runtime and hands the
    /// completion to `callback` on the main loop behind `dispatcher`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_typed<R, F>(
        &self,
        endpoint: Endpoint<R>,
        dispatcher: &MainDispatcher,
        callback: F,
    ) -> RequestHandle
    where
        R: DeserializeOwned + Send + 'static,
        F: FnOnce(Completion<R>) + Send + 'static,
    {
        let client = self.clone();
        let dispatcher = dispatcher.clone();
        let task = tokio::spawn(async move {
            let completion = client.execute_typed(&endpoint).await;
            if !dispatcher.dispatch(move || callback(completion)) {
                warn!("main loop closed before completion was delivered");
            }
        });
        RequestHandle::new(task.abort_handle())
    }

    /// Callback form of [`Self::execute_empty`]; see [`Self::spawn_typed`].
    pub fn spawn_empty<F>(
        &self,
        endpoint: Endpoint<Empty>,
        dispatcher: &MainDispatcher,
        callback: F,
    ) -> RequestHandle
    where
        F: FnOnce(Result<(), EndpointClientError>) + Send + 'static,
    {
        let client = self.clone();
        let dispatcher = dispatcher.clone();
        let task = tokio::spawn(async move {
            let result = client.execute_empty(&endpoint).await;
            if !dispatcher.dispatch(move || callback(result)) {
                warn!("main loop closed before completion was delivered");
            }
        });
        RequestHandle::new(task.abort_handle())
    }
}

impl<T> Clone for EndpointClient<T> {
    fn clone(&self) -> Self {
        EndpointClient {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
        }
    }
}

fn decode<R: DeserializeOwned>(body: Option<&Bytes>) -> Result<R, EndpointClientError> {
    let body = match body {
        Some(body) if !body.is_empty() => body,
        _ => return Err(EndpointClientError::NoParsingData),
    };
    serde_json::from_slice(body).map_err(|err| {
        warn!(error = %err, body = %String::from_utf8_lossy(body), "failed to decode response");
        EndpointClientError::ParsingError
    })
}
