use crate::errors::Error;

/// Query parameter name the service expects the bearer token under.
pub const TOKEN_QUERY_PARAM: &str = "watson-token";

const USER_AGENT: &str = concat!("rest-dispatch-rust/", env!("CARGO_PKG_VERSION"));

/// Where the bearer token is attached to an outgoing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenPlacement {
    /// Appended to the URL query under the given parameter name,
    /// regardless of how the request body is encoded.
    Query(String),
    /// Sent as `Authorization: Bearer <token>`.
    BearerHeader,
}

impl TokenPlacement {
    pub fn query(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Config("Token query parameter name is empty".into()));
        }
        Ok(TokenPlacement::Query(name))
    }
}

impl Default for TokenPlacement {
    fn default() -> Self {
        TokenPlacement::Query(TOKEN_QUERY_PARAM.to_string())
    }
}

/// Policy knobs for the dispatcher.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Bounds refresh attempts per exhaustion cycle.
    pub max_retries: u32,
    pub token_placement: TokenPlacement,
    pub user_agent: String,
}

impl DispatchConfig {
    pub fn new(max_retries: u32, token_placement: TokenPlacement) -> Result<Self, Error> {
        if max_retries == 0 {
            return Err(Error::Config("max_retries must be >= 1".into()));
        }
        Ok(Self {
            max_retries,
            token_placement,
            user_agent: USER_AGENT.to_string(),
        })
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            token_placement: TokenPlacement::default(),
            user_agent: USER_AGENT.to_string(),
        }
    }
}
