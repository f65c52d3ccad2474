use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::Error;
use crate::request::{ParameterEncoding, RequestDescriptor};

/// Response metadata and raw body as delivered by the transport, exactly once
/// per submitted request.
#[derive(Clone, Debug)]
pub struct TransportReply {
    pub status: StatusCode,
    pub body: Bytes,
}

impl TransportReply {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Sends a fully-formed request over the wire.
///
/// Contract: `Ok` for every HTTP status the server produced, 401 included,
/// since the dispatcher decides what a 401 means; `Err` only for wire-level
/// failures that never reached a status line.
#[async_trait]
pub trait TransportClient: Send + Sync {
    async fn submit(&self, request: &RequestDescriptor) -> Result<TransportReply, Error>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl TransportClient for HttpTransport {
    async fn submit(&self, request: &RequestDescriptor) -> Result<TransportReply, Error> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .query(&request.effective_query())
            .header("User-Agent", &self.user_agent);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        match request.encoding {
            ParameterEncoding::Url => {}
            ParameterEncoding::Json => {
                if !request.params.is_empty() {
                    builder = builder.json(&request.params);
                }
            }
            ParameterEncoding::Form => {
                if !request.params.is_empty() {
                    builder = builder.form(&request.params);
                }
            }
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            "transport.reply"
        );
        Ok(TransportReply { status, body })
    }
}
