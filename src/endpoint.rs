use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use crate::errors::EndpointClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }

    /// Headers every request with this method carries.
    pub fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if matches!(self, HttpMethod::Post | HttpMethod::Put) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `name=value` pair of a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryItem {
    pub name: String,
    pub value: String,
}

impl QueryItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Response marker for endpoints that expect no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Empty;

pub struct Endpoint<R> {
    method: HttpMethod,
    path: String,
    parameters: Option<Map<String, Value>>,
    invalid_parameter: Option<String>,
    query_items: Option<Vec<QueryItem>>,
    timeout: Option<Duration>,
    _response: PhantomData<fn() -> R>,
}

impl<R> Endpoint<R> {
    fn with_method(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            parameters: None,
            invalid_parameter: None,
            query_items: None,
            timeout: None,
            _response: PhantomData,
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_items
            .get_or_insert_with(Vec::new)
            .push(QueryItem::new(name, value));
        self
    }

    /// Adds one body parameter. A value that cannot be represented as JSON
    /// is remembered and reported as `CantBuildRequestBody` on execution.
    pub fn parameter(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.parameters
                    .get_or_insert_with(Map::new)
                    .insert(key, value);
            }
            Err(err) => {
                if self.invalid_parameter.is_none() {
                    self.invalid_parameter = Some(format!("{key}: {err}"));
                }
            }
        }
        self
    }

    pub fn parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters
            .get_or_insert_with(Map::new)
            .extend(parameters);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> HeaderMap {
        self.method.default_headers()
    }

    pub fn parameter_map(&self) -> Option<&Map<String, Value>> {
        self.parameters.as_ref()
    }

    pub fn query_items(&self) -> Option<&[QueryItem]> {
        self.query_items.as_deref()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// JSON request body, `None` when the endpoint has no parameters.
    pub fn body(&self) -> Result<Option<Vec<u8>>, EndpointClientError> {
        if let Some(reason) = &self.invalid_parameter {
            tracing::warn!(path = %self.path, %reason, "endpoint parameter is not JSON-representable");
            return Err(EndpointClientError::CantBuildRequestBody);
        }
        match &self.parameters {
            Some(parameters) => serde_json::to_vec(parameters)
                .map(Some)
                .map_err(|_| EndpointClientError::CantBuildRequestBody),
            None => Ok(None),
        }
    }
}

impl<T> Endpoint<T>
where
    T: serde::de::DeserializeOwned,
{
    /// Endpoint whose response body decodes into `T`.
    pub fn typed(method: HttpMethod, path: impl Into<String>) -> Self {
        Self::with_method(method, path)
    }
}

impl Endpoint<Empty> {
    /// Endpoint whose response carries no payload.
    pub fn empty(method: HttpMethod, path: impl Into<String>) -> Self {
        Self::with_method(method, path)
    }
}

impl<R> Clone for Endpoint<R> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            path: self.path.clone(),
            parameters: self.parameters.clone(),
            invalid_parameter: self.invalid_parameter.clone(),
            query_items: self.query_items.clone(),
            timeout: self.timeout,
            _response: PhantomData,
        }
    }
}

impl<R> fmt::Debug for Endpoint<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("parameters", &self.parameters)
            .field("query_items", &self.query_items)
            .field("timeout", &self.timeout)
            .finish()
    }
}
