use thiserror::Error;

/// Failure kinds reported by a transport call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    #[error("Network Error: request could not reach the server")]
    NetworkProblem,

    #[error("Server Error: the server failed to handle the request")]
    ServerFail,

    // Reserved for purchase receipt validation, nothing in the request path produces it.
    #[error("Receipt Error: no purchase receipt available")]
    NoReceipt,

    #[error("Request Error: server rejected the request ({code}): {message}")]
    InvalidRequest { code: i32, message: String },
}

/// Errors delivered to callers of [`crate::EndpointClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointClientError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Response Error: response carried no data to decode")]
    NoParsingData,

    #[error("Response Error: failed to decode response body")]
    ParsingError,

    #[error("Request Error: endpoint parameters could not be encoded as JSON")]
    CantBuildRequestBody,

    #[error("Request Error: base URL and path do not form a valid URL")]
    WrongUrl,
}

/// Errors raised while constructing a client, before any call is made.
#[derive(Error, Debug)]
pub enum ClientBuildError {
    #[error("Configuration Error: Failed to build HTTP client: {0}")]
    HttpClientBuildFailed(#[from] reqwest::Error),
}
