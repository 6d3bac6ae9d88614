// Declare modules within this crate
pub mod cards;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod errors;
pub mod transport;
pub mod web_date;

// Re-export the main components for users of this crate
pub use client::{Completion, EndpointClient};
pub use config::ClientConfig;
pub use dispatch::{main_context, MainDispatcher, MainLoop, RequestHandle};
pub use endpoint::{Empty, Endpoint, HttpMethod, QueryItem};
pub use errors::{ClientBuildError, EndpointClientError, ServerError};
pub use transport::{
    classify, CallOptions, HttpTransport, Outcome, RawResponse, ResponseMeta, Transport,
    TransportFault, TransportRequest,
};
