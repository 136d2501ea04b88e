//! 🔌 Backends — where the real I/O happens.
//!
//! 📡 Every flow talks to the outside world through exactly one seam: [`HttpClient`].
//! In production that's reqwest wearing a timeout. In tests it's
//! [`InMemoryHttpClient`], a stunt double that answers from a script and remembers
//! everything you said to it. The old mock endpoints live on as that stunt double.
//!
//! 🧠 Knowledge graph:
//! - `HttpRequest` / `HttpResponse`: plain owned data, no reqwest types leak out.
//! - `HttpClient`: the trait. `execute` never judges status codes.
//! - `send_expecting_success`: the judge. Non-2xx becomes `IntegrationError::Transport`.
//! - `common_config::HttpSettings`: timeouts, the only knobs we have. 🦆

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{IntegrationError, Result};
use crate::signing;

pub mod common_config;
pub mod in_mem;
pub mod reqwest_http;

pub use common_config::HttpSettings;
pub use in_mem::InMemoryHttpClient;
pub use reqwest_http::ReqwestHttpClient;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";
pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_XML: &str = "application/xml";
pub const TEXT_XML: &str = "text/xml";

/// 🚦 The two verbs these flows ever use. REST purists may avert their eyes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// 📨 One outbound request, fully assembled before anyone touches a socket.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            ..Self::get(url)
        }
    }

    /// 🏷️ Set a header, replacing any earlier value with the same (case-insensitive) name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn basic_auth(self, user: &str, password: &str) -> Self {
        self.header(AUTHORIZATION, signing::basic_auth_value(user, password))
    }

    pub fn json_body(self, body: impl Into<String>) -> Self {
        self.with_body(APPLICATION_JSON, body)
    }

    pub fn xml_body(self, body: impl Into<String>) -> Self {
        self.with_body(APPLICATION_XML, body)
    }

    /// 🧼 SOAP-ish endpoints want `text/xml` and will sulk at anything else.
    pub fn soap_body(self, body: impl Into<String>) -> Self {
        self.with_body(TEXT_XML, body)
    }

    fn with_body(mut self, content_type: &str, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.header(CONTENT_TYPE, content_type)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// 📬 What came back. Read fully into memory, because these payloads are small
/// and our patience for streaming XML is smaller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 📡 The one seam between flows and the network.
///
/// # Contract 📜
/// - `execute` returns `Ok` for ANY response that arrived, 2xx or not.
/// - `Err` means no response at all (`IntegrationError::Network`).
/// - Status judgement belongs to [`send_expecting_success`].
#[async_trait]
pub trait HttpClient: Send + Sync + std::fmt::Debug {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// ⚖️ Execute and insist on 2xx. Anything else becomes a `Transport` error
/// carrying the status and the body, so the postmortem writes itself.
pub async fn send_expecting_success(
    client: &dyn HttpClient,
    request: HttpRequest,
) -> Result<HttpResponse> {
    let url = request.url.clone();
    debug!("📡 {} {}", request.method.as_str(), url);
    let response = client.execute(request).await?;
    if !response.is_success() {
        warn!("💀 {} answered HTTP {}", url, response.status);
        return Err(IntegrationError::Transport {
            status: response.status,
            url,
            body: response.body,
        });
    }
    Ok(response)
}
