//! # Previously, on cpx...
//!
//! 🎬 Once upon a time every flow had a sibling "mock" script that pretended to be
//! the tax service, the ERP, the catalog, the revenue office. They returned
//! canned answers and nobody checked what they were asked.
//!
//! That whole family now lives here, as [`InMemoryHttpClient`]: a scripted
//! [`HttpClient`] that answers from a routing table and writes down every
//! request it saw, behind an `Arc<Mutex<...>>`, so tests can read the diary.
//!
//! ⚠️ This is NOT for production. This is for tests. If you're deploying this
//! to prod, please also deploy a therapist.
//!
//! ✅ No network calls. No sockets. No heartbeat. Just vibes and heap memory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backends::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::error::Result;

/// 🎭 A pretend internet with a very short list of websites.
///
/// Unknown routes answer `404` with an empty body, which is also how most real
/// integration endpoints greet you on a Monday.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHttpClient {
    routes: HashMap<(HttpMethod, String), HttpResponse>,
    /// 🔒 The diary. Every request, in order. Clone the client and you share the diary.
    recorded: Arc<Mutex<Vec<HttpRequest>>>,
}

impl InMemoryHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 🗺️ Teach the pretend internet one more answer.
    pub fn route(mut self, method: HttpMethod, url: impl Into<String>, response: HttpResponse) -> Self {
        self.routes.insert((method, url.into()), response);
        self
    }

    /// 📖 Everything we were asked, oldest first.
    pub async fn recorded(&self) -> Vec<HttpRequest> {
        self.recorded.lock().await.clone()
    }

    fn lookup(&self, method: HttpMethod, url: &str) -> Option<&HttpResponse> {
        self.routes.get(&(method, url.to_string())).or_else(|| {
            // 🔍 No exact hit: try again without the query string.
            let without_query = url.split('?').next().unwrap_or(url);
            self.routes.get(&(method, without_query.to_string()))
        })
    }
}

#[async_trait]
impl HttpClient for InMemoryHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self
            .lookup(request.method, &request.url)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, ""));
        self.recorded.lock().await.push(request);
        Ok(response)
    }
}
