//! In-memory [`Transport`] for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::fetch::{FetchError, Transport, TransportResponse};

type Route = Result<TransportResponse, FetchError>;

/// Serves canned responses per (method, URL) and records every request.
/// Unrouted URLs answer 404.
#[derive(Default)]
pub(crate) struct FakeTransport {
    heads: Mutex<HashMap<String, Route>>,
    gets: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn head_ok(&self, url: &str) -> &Self {
        self.head_status(url, 200)
    }

    pub(crate) fn head_status(&self, url: &str, status: u16) -> &Self {
        let response = TransportResponse { status, content_type: None, body: Bytes::new() };
        self.heads.lock().unwrap().insert(url.to_string(), Ok(response));
        self
    }

    pub(crate) fn head_err(&self, url: &str, err: FetchError) -> &Self {
        self.heads.lock().unwrap().insert(url.to_string(), Err(err));
        self
    }

    pub(crate) fn get_ok(&self, url: &str, content_type: &str, body: &str) -> &Self {
        let response = TransportResponse {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: Bytes::from(body.to_string()),
        };
        self.gets.lock().unwrap().insert(url.to_string(), Ok(response));
        self
    }

    pub(crate) fn get_err(&self, url: &str, err: FetchError) -> &Self {
        self.gets.lock().unwrap().insert(url.to_string(), Err(err));
        self
    }

    /// Requests made so far, as `"HEAD <url>"` / `"GET <url>"`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn answer(&self, routes: &Mutex<HashMap<String, Route>>, method: &str, url: &str) -> Route {
        self.calls.lock().unwrap().push(format!("{method} {url}"));
        routes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Ok(TransportResponse { status: 404, content_type: None, body: Bytes::new() }))
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn head(&self, url: &str, _timeout: Duration) -> Result<TransportResponse, FetchError> {
        self.answer(&self.heads, "HEAD", url)
    }

    async fn get(&self, url: &str, _accept: &str, _timeout: Duration) -> Result<TransportResponse, FetchError> {
        self.answer(&self.gets, "GET", url)
    }
}
