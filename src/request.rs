use reqwest::Method;
use serde_json::{Map, Value};
use tokio::sync::oneshot;

use crate::config::TokenPlacement;
use crate::errors::Error;
use crate::transport::TransportReply;

/// How request parameters travel on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterEncoding {
    /// Stringified into the URL query.
    Url,
    /// Serialized as a JSON body.
    Json,
    /// Serialized as an `application/x-www-form-urlencoded` body.
    Form,
}

/// Everything needed to issue (or re-issue) a call: captured once at dispatch
/// time so a parked request can be replayed verbatim after a refresh.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Query pairs always appended to the URL, independent of `encoding`.
    pub query: Vec<(String, String)>,
    pub params: Map<String, Value>,
    pub encoding: ParameterEncoding,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            params: Map::new(),
            encoding: ParameterEncoding::Url,
        }
    }

    /// Clone with the bearer token merged in per placement. Query placement
    /// lands in the URL query even when the body carries the parameters.
    pub fn authorized(&self, token: &str, placement: &TokenPlacement) -> RequestDescriptor {
        let mut request = self.clone();
        match placement {
            TokenPlacement::Query(name) => {
                request.query.push((name.clone(), token.to_string()));
            }
            TokenPlacement::BearerHeader => {
                request
                    .headers
                    .push(("Authorization".to_string(), format!("Bearer {token}")));
            }
        }
        request
    }

    /// Query pairs to send: explicit `query` plus stringified `params` when
    /// URL-encoded.
    pub fn effective_query(&self) -> Vec<(String, String)> {
        let mut pairs = self.query.clone();
        if self.encoding == ParameterEncoding::Url {
            for (key, value) in &self.params {
                pairs.push((key.clone(), stringify(value)));
            }
        }
        pairs
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A replay-queue entry: the descriptor plus the channel the final outcome is
/// delivered on. Settlement consumes the entry, so a request can never be
/// answered twice.
#[derive(Debug)]
pub struct PendingRequest {
    pub descriptor: RequestDescriptor,
    reply_tx: oneshot::Sender<Result<TransportReply, Error>>,
}

impl PendingRequest {
    pub fn new(
        descriptor: RequestDescriptor,
        reply_tx: oneshot::Sender<Result<TransportReply, Error>>,
    ) -> Self {
        Self {
            descriptor,
            reply_tx,
        }
    }

    pub fn succeed(self, reply: TransportReply) {
        // The caller may have dropped its handle; nothing to do then.
        let _ = self.reply_tx.send(Ok(reply));
    }

    pub fn fail(self, error: Error) {
        let _ = self.reply_tx.send(Err(error));
    }
}

/// Receiver half of a detached dispatch. Resolves exactly once with the final
/// outcome; a dispatcher torn down before settlement yields
/// [`Error::InternalUnavailable`].
#[derive(Debug)]
pub struct ReplyHandle {
    rx: oneshot::Receiver<Result<TransportReply, Error>>,
}

impl ReplyHandle {
    pub(crate) fn new(rx: oneshot::Receiver<Result<TransportReply, Error>>) -> Self {
        Self { rx }
    }

    pub async fn settled(self) -> Result<TransportReply, Error> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::InternalUnavailable),
        }
    }
}
