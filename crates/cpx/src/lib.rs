//! 🔌 cpx — integration flows between business systems, one message at a time.
//!
//! 🎬 A message comes in (body, headers, properties), a flow resolves its
//! configuration from it, talks to one or two HTTP endpoints, maps the answer and
//! hands back a new body. Everything that went over the wire is pinned to the
//! [`diagnostics::MessageLog`] so the post-mortem has evidence. 🦆

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

pub mod app_config;
pub mod backends;
pub mod datastore;
pub mod diagnostics;
pub mod error;
pub mod flows;
pub mod irmark;
pub mod message;
pub mod resolve;
pub mod signing;
pub mod suretax;
pub mod transforms;
pub mod xml;

use crate::app_config::AppConfig;
use crate::backends::ReqwestHttpClient;
use crate::datastore::InMemoryDataStore;
use crate::flows::{FlowContext, build_flow, run_flow};
use crate::message::Message;

/// 🏗️ Real HTTP, RAM-only staging store, fresh message log.
pub fn build_context(app_config: &AppConfig) -> Result<FlowContext> {
    let http = ReqwestHttpClient::new(&app_config.http)?;
    Ok(FlowContext::new(Arc::new(http), Arc::new(InMemoryDataStore::new())))
}

/// 🚀 Load the configured message and push it through the configured flow.
pub async fn run(app_config: &AppConfig, ctx: &FlowContext) -> Result<Message> {
    let message = app_config.message.load().await?;
    let flow = build_flow(app_config.flow);
    info!("🎬 running {} with {} header(s) and {} propert(ies)", flow.name(), message.headers.len(), message.properties.len());
    run_flow(flow.as_ref(), ctx, message)
        .await
        .with_context(|| format!("💀 Flow '{}' did not make it to the end credits", flow.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::MessageConfig;
    use crate::backends::HttpSettings;
    use crate::flows::FlowKind;
    use std::collections::HashMap;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn the_config(target_url: String) -> AppConfig {
        AppConfig {
            flow: FlowKind::CategoryImport,
            message: MessageConfig {
                body_file: None,
                body: Some(r#"["cat1","cat2"]"#.into()),
                headers: HashMap::from([
                    ("user".to_string(), "admin".to_string()),
                    ("password".to_string(), "nimda".to_string()),
                ]),
                properties: HashMap::from([
                    ("catalogId".to_string(), "MYCAT".to_string()),
                    ("catalogVersion".to_string(), "Online".to_string()),
                    ("targetUrl".to_string(), target_url),
                ]),
            },
            http: HttpSettings::default(),
        }
    }

    #[tokio::test]
    async fn the_one_where_a_category_import_goes_over_real_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/odata/Categories"))
            .and(header("Authorization", "Basic YWRtaW46bmltZGE="))
            .and(body_string_contains("<integrationKey>cat2</integrationKey>"))
            .respond_with(ResponseTemplate::new(201).set_body_string("<created/>"))
            .expect(1)
            .mount(&server)
            .await;

        let app_config = the_config(format!("{}/odata/Categories", server.uri()));
        let ctx = build_context(&app_config).expect("client builds");
        let the_result = run(&app_config, &ctx).await.expect("201 is a success");

        assert_eq!(the_result.body, "<created/>");
        assert!(ctx.log.find("category-import-request").await.is_some());
        assert!(ctx.log.find("category-import-response").await.is_some());
    }

    #[tokio::test]
    async fn the_one_where_the_error_chain_names_the_flow_and_the_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let app_config = the_config(format!("{}/odata/Categories", server.uri()));
        let ctx = build_context(&app_config).expect("client builds");
        let the_error = run(&app_config, &ctx).await.expect_err("502 is fatal");

        let the_chain: Vec<String> = the_error.chain().map(ToString::to_string).collect();
        assert!(the_chain[0].contains("category_import"));
        assert_eq!(the_chain.len(), 2, "context, then the flow error; nothing repeated: {the_chain:?}");
        assert_eq!(the_chain.iter().filter(|cause| cause.contains("HTTP 502")).count(), 1);
        assert!(ctx.log.find("category_import-error-payload").await.is_some());
    }
}
