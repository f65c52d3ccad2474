#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use tracing::subscriber::{DefaultGuard, set_default};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Registry, fmt};

use rest_dispatch::errors::Error;
use rest_dispatch::{RequestDescriptor, TokenRefresher, TransportClient, TransportReply};

pub fn get(url: &str) -> RequestDescriptor {
    RequestDescriptor::new(Method::GET, url)
}

pub fn query_value(request: &RequestDescriptor, name: &str) -> Option<String> {
    request
        .query
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
}

pub enum ScriptItem {
    Reply { status: u16, body: String },
    WireError,
}

impl ScriptItem {
    pub fn reply(status: u16, body: &str) -> Self {
        ScriptItem::Reply {
            status,
            body: body.to_string(),
        }
    }
}

/// Transport fake: answers from a script, then `200 {"ok":true}` once the
/// script runs dry. Records every authorized request it was handed.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<ScriptItem>>,
    seen: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedTransport {
    pub fn ok() -> Arc<Self> {
        Self::scripted(Vec::new())
    }

    pub fn scripted(items: Vec<ScriptItem>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(items.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<RequestDescriptor> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_urls(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }
}

#[async_trait]
impl TransportClient for ScriptedTransport {
    async fn submit(&self, request: &RequestDescriptor) -> Result<TransportReply, Error> {
        self.seen.lock().unwrap().push(request.clone());
        let item = self.script.lock().unwrap().pop_front();
        match item {
            Some(ScriptItem::Reply { status, body }) => Ok(TransportReply {
                status: StatusCode::from_u16(status).unwrap(),
                body: Bytes::from(body),
            }),
            Some(ScriptItem::WireError) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "link down",
            ))),
            None => Ok(TransportReply {
                status: StatusCode::OK,
                body: Bytes::from_static(br#"{"ok":true}"#),
            }),
        }
    }
}

/// Refresher fake: counts invocations, optionally sleeps to widen the
/// refresh window, answers from a script and then from a fallback.
pub struct FakeRefresher {
    calls: AtomicU32,
    delay: Duration,
    hang: bool,
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: Result<String, String>,
}

impl FakeRefresher {
    pub fn succeeding(token: &str) -> Self {
        Self {
            calls: AtomicU32::new(0),
            delay: Duration::ZERO,
            hang: false,
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(token.to_string()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            calls: AtomicU32::new(0),
            delay: Duration::ZERO,
            hang: false,
            script: Mutex::new(VecDeque::new()),
            fallback: Err(reason.to_string()),
        }
    }

    pub fn fail_times_then(failures: u32, reason: &str, token: &str) -> Self {
        let script = (0..failures)
            .map(|_| Err(reason.to_string()))
            .collect::<VecDeque<_>>();
        Self {
            calls: AtomicU32::new(0),
            delay: Duration::ZERO,
            hang: false,
            script: Mutex::new(script),
            fallback: Ok(token.to_string()),
        }
    }

    /// Never settles; used to tear the dispatcher down mid-refresh.
    pub fn hanging() -> Self {
        Self {
            calls: AtomicU32::new(0),
            delay: Duration::ZERO,
            hang: true,
            script: Mutex::new(VecDeque::new()),
            fallback: Err("unreachable".to_string()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for FakeRefresher {
    async fn refresh(&self) -> Result<String, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.map_err(Error::RefreshFailed)
    }
}

struct VecWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl std::io::Write for VecWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.lines.lock().unwrap();
        guard.push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn capture_logs() -> (Arc<Mutex<Vec<String>>>, DefaultGuard) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let writer_lines = lines.clone();
    let subscriber = Registry::default().with(
        fmt::Layer::default()
            .with_writer(move || VecWriter {
                lines: writer_lines.clone(),
            })
            .with_target(false)
            .with_level(true)
            .with_ansi(false),
    );
    let guard = set_default(subscriber);
    (lines, guard)
}

pub fn drain_logs(lines: Arc<Mutex<Vec<String>>>) -> Vec<String> {
    let guard = lines.lock().unwrap();
    guard.clone()
}
