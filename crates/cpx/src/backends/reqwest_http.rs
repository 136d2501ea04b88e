//! # 📡 THE REQWEST BACKEND
//!
//! 🎬 COLD OPEN — INT. MIDDLEWARE — 3:47 AM
//!
//! Somewhere an ERP system wants to tell a tax service about a credit memo.
//! The tax service wants Basic-Auth and a JSON body. The ERP wants the answer
//! in XML. Between them: this file, a reqwest::Client, and two timeouts.
//!
//! 🚀 This module turns an [`HttpRequest`] into bytes on a wire and the answer
//! back into an [`HttpResponse`]. It does not retry. It does not judge the
//! status code. It reports what happened, like a good witness. 🦆

use anyhow::Context;
use async_trait::async_trait;
use tracing::trace;

use crate::backends::{HttpClient, HttpMethod, HttpRequest, HttpResponse, HttpSettings};
use crate::error::{IntegrationError, Result};

/// 📡 Production [`HttpClient`] backed by one reused `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    // 📡 Reused across requests, because a fresh client per call is the networking
    // equivalent of buying a new car every time you need milk.
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// 🚀 Build the client with the configured connect and request timeouts.
    pub fn new(settings: &HttpSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.timeout())
            .build()
            .context("💀 The HTTP client refused to be born. Probably the TLS stack, possibly the moon phase.")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|err| IntegrationError::Network {
            url: request.url.clone(),
            message: err.to_string(),
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // 📦 Read it all. These payloads are invoices, not 4K video.
        let body = response.text().await.map_err(|err| IntegrationError::Network {
            url: request.url.clone(),
            message: format!("reading response body: {err}"),
        })?;
        trace!("📬 {} answered {} ({} bytes)", request.url, status, body.len());

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::send_expecting_success;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn the_client() -> ReqwestHttpClient {
        ReqwestHttpClient::new(&HttpSettings::default()).expect("client builds with defaults")
    }

    #[tokio::test]
    async fn the_one_where_basic_auth_and_json_actually_reach_the_server() {
        let the_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tax/adjust"))
            .and(header("Authorization", "Basic dXNlcjpwYXNz"))
            .and(header("Content-Type", "application/json"))
            .and(body_string(r#"{"a":1}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(1)
            .mount(&the_server)
            .await;

        let the_request = HttpRequest::post(format!("{}/tax/adjust", the_server.uri()))
            .basic_auth("user", "pass")
            .json_body(r#"{"a":1}"#);
        let the_response = the_client()
            .execute(the_request)
            .await
            .expect("the mock server is right there");

        assert_eq!(the_response.status, 200);
        assert_eq!(the_response.body, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn the_one_where_a_500_keeps_its_status_and_body() {
        let the_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream on fire"))
            .mount(&the_server)
            .await;

        let the_client = the_client();
        let result = send_expecting_success(
            &the_client,
            HttpRequest::get(format!("{}/status", the_server.uri())),
        )
        .await;

        let the_error = result.expect_err("500 must not be a success");
        assert_eq!(the_error.http_status(), Some(500));
        assert!(the_error.to_string().contains("upstream on fire"));
    }

    #[tokio::test]
    async fn the_one_where_nobody_is_listening() {
        // 🔌 Port 9 is the discard protocol. Nobody runs it. That's the point.
        let result = the_client()
            .execute(HttpRequest::get("http://127.0.0.1:9/nothing"))
            .await;
        assert!(matches!(result, Err(IntegrationError::Network { .. })));
    }
}
