//! Scripted transport for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{RawResponse, Transport};
use crate::{Error, Result};

/// What the mock answers for one request
pub(crate) enum Reply {
    Json(Value),
    Status(u16, String),
    Fail(String),
    Slow(Duration, Box<Reply>),
}

type Handler = dyn Fn(&str, &[(String, String)]) -> Reply + Send + Sync;

pub(crate) struct MockTransport {
    handler: Box<Handler>,
    calls: AtomicUsize,
    paths: Mutex<Vec<String>>,
}

impl MockTransport {
    pub(crate) fn new(
        handler: impl Fn(&str, &[(String, String)]) -> Reply + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().unwrap().push(path.to_string());

        let mut reply = (self.handler)(path, query);
        loop {
            match reply {
                Reply::Slow(delay, next) => {
                    tokio::time::sleep(delay).await;
                    reply = *next;
                }
                Reply::Json(value) => return Ok(RawResponse::new(200, value.to_string())),
                Reply::Status(status, body) => return Ok(RawResponse::new(status, body)),
                Reply::Fail(msg) => return Err(Error::Transport(msg)),
            }
        }
    }
}
