use std::fmt;

use reqwest::StatusCode;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Http(reqwest::Error),
    Json(serde_json::Error),
    /// Non-2xx, non-401 status passed through from the transport: status plus body text.
    Transport(StatusCode, String),
    /// A single refresh cycle reported failure by the external refresher.
    RefreshFailed(String),
    /// The refresh retry budget is spent: attempts made, last underlying cause.
    AuthExhausted(u32, String),
    /// The dispatcher was torn down before a parked request could settle.
    InternalUnavailable,
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Http(err) => write!(f, "http error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
            Error::Transport(status, body) => {
                write!(f, "transport returned {status}: {body}")
            }
            Error::RefreshFailed(reason) => write!(f, "token refresh failed: {reason}"),
            Error::AuthExhausted(attempts, cause) => write!(
                f,
                "authentication exhausted after {attempts} refresh attempt(s): {cause}"
            ),
            Error::InternalUnavailable => {
                write!(f, "dispatcher no longer available")
            }
            Error::Config(reason) => write!(f, "config error: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
