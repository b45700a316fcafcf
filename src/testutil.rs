//! Shared test helpers — available to all `#[cfg(test)]` modules in the crate.

use std::future::Future;
use std::sync::Arc;

use http::header::{AUTHORIZATION, LOCATION};
use http::{HeaderMap, HeaderValue};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::bridge::AppShell;
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::{BoxError, Error};
use crate::session::Session;
use crate::storage::MemoryStorage;
use crate::transport::{HttpRequest, HttpResponse, Transport};

type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse, Error> + Send + Sync;

struct ScriptedInner {
    responder: Box<Responder>,
    requests: Mutex<Vec<HttpRequest>>,
    yield_first: bool,
}

/// In-process transport answering from a closure and recording every request.
#[derive(Clone)]
pub struct ScriptedTransport {
    inner: Arc<ScriptedInner>,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, Error> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ScriptedInner {
                responder: Box::new(responder),
                requests: Mutex::new(Vec::new()),
                yield_first: false,
            }),
        }
    }

    /// Transport for tests that must not touch the network.
    pub fn unreachable() -> Self {
        Self::new(|req| Err(Error::Transport(format!("unexpected request to {}", req.url))))
    }

    /// Yield to the scheduler before answering, so concurrent callers interleave.
    pub fn with_yield(self) -> Self {
        let inner = Arc::try_unwrap(self.inner)
            .unwrap_or_else(|_| panic!("with_yield must be called before cloning"));
        Self {
            inner: Arc::new(ScriptedInner {
                yield_first: true,
                ..inner
            }),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.requests.lock().clone()
    }

    pub fn count_matching(&self, path: &str) -> usize {
        self.inner
            .requests
            .lock()
            .iter()
            .filter(|r| r.url.contains(path))
            .count()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        if self.inner.yield_first {
            tokio::task::yield_now().await;
        }
        self.inner.requests.lock().push(request.clone());
        (self.inner.responder)(&request)
    }
}

pub fn reply(status: u16, body: JsonValue) -> HttpResponse {
    reply_text(status, &body.to_string())
}

pub fn reply_text(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: HeaderMap::new(),
        body: body.to_owned(),
    }
}

pub fn reply_redirect(location: &str) -> HttpResponse {
    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, HeaderValue::from_str(location).unwrap());
    HttpResponse {
        status: 302,
        headers,
        body: String::new(),
    }
}

/// Token carried by a request's `Authorization` header.
pub fn bearer(request: &HttpRequest) -> Option<String> {
    request
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

pub fn test_config() -> ClientConfig {
    ClientConfig::new("https://api.test".parse().unwrap())
}

pub fn test_client(
    transport: ScriptedTransport,
    storage: MemoryStorage,
) -> ApiClient<ScriptedTransport, MemoryStorage> {
    ApiClient::new(test_config(), transport, storage, Arc::new(Session::new()))
}

/// Everything the core asked the shell to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Navigate { path: String, replace: bool },
    CloseBrowser,
    Error(String),
}

#[derive(Default)]
pub struct RecordingShell {
    events: Mutex<Vec<ShellEvent>>,
    fail_close: bool,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<ShellEvent> {
        self.events.lock().clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ShellEvent::Navigate { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ShellEvent::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl AppShell for RecordingShell {
    fn navigate(&self, path: &str, replace: bool) {
        self.events.lock().push(ShellEvent::Navigate {
            path: path.to_owned(),
            replace,
        });
    }

    fn close_browser(&self) -> impl Future<Output = Result<(), BoxError>> + Send {
        self.events.lock().push(ShellEvent::CloseBrowser);
        let fail = self.fail_close;
        async move {
            if fail {
                Err("no browser open".into())
            } else {
                Ok(())
            }
        }
    }

    fn show_error(&self, message: &str) {
        self.events.lock().push(ShellEvent::Error(message.to_owned()));
    }
}
