//! In-process network fake for worker tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use netfirst_core::{Error, Request, Response};
use url::Url;

use crate::fetch::Network;

pub(crate) const ORIGIN: &str = "http://localhost:8100";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub(crate) fn get(path: &str) -> Request {
    Request::get(url(path))
}

/// Serves fixed bodies by path; unknown paths get a 404. Can be switched offline.
pub(crate) struct MockNetwork {
    routes: Mutex<HashMap<String, (u16, String)>>,
    online: AtomicBool,
    log: Mutex<Vec<(String, String)>>,
}

impl MockNetwork {
    pub(crate) fn new() -> Self {
        Self { routes: Mutex::new(HashMap::new()), online: AtomicBool::new(true), log: Mutex::new(Vec::new()) }
    }

    /// Routes every path in `paths` with a 200 and a body naming the path.
    pub(crate) fn serving(paths: &[&str]) -> Self {
        let network = Self::new();
        for path in paths {
            network.route(path, 200, &format!("body of {path}"));
        }
        network
    }

    pub(crate) fn route(&self, path: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.to_string()));
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of requests seen for `path`, online or not.
    pub(crate) fn hits(&self, path: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|(_, p)| p == path).count()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let path = request.url().path().to_string();
        self.log
            .lock()
            .unwrap()
            .push((request.method().to_string(), path.clone()));

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url())));
        }

        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .unwrap_or((404, "Not found".to_string()));

        Ok(Response {
            url: request.url().clone(),
            status,
            headers: vec![("content-type".to_string(), "text/plain; charset=utf-8".to_string())],
            body: Bytes::from(body),
        })
    }
}
