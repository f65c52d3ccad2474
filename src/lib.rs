mod config;
mod credential;
mod dispatcher;
pub mod errors;
mod refresher;
mod request;
mod telemetry;
mod transport;

pub use config::{DispatchConfig, TOKEN_QUERY_PARAM, TokenPlacement};
pub use credential::Credential;
pub use dispatcher::AuthorizingDispatcher;
pub use errors::Error;
pub use refresher::TokenRefresher;
pub use request::{ParameterEncoding, PendingRequest, ReplyHandle, RequestDescriptor};
pub use telemetry::{DrainOutcome, RefreshTelemetry};
pub use transport::{HttpTransport, TransportClient, TransportReply};
