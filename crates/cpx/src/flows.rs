//! 🎬 Flows — configure, call, map, (stage), forward, return. Repeat forty times.
//!
//! 🎬 *[camera pans across forty nearly identical scripts]*
//! 🎬 "In a world where every integration was copy-pasted..."
//! 🎬 "One trait dared to say: the shape is always the same."
//! 🎬 *[record scratch]* 🦆
//!
//! Every flow is a [`Flow`]: it declares its configuration keys and implements
//! `execute`. [`run_flow`] is the only place errors are caught. It resolves the
//! config, runs the flow, and on failure pins the offending payload to the
//! message log, logs it, and wraps the error ONCE with the flow's name. No retry,
//! no partial success, no compensation. The platform above us owns fault policy.
//!
//! 🧠 Knowledge graph:
//! - `FlowContext`: the HTTP seam, the datastore, the message log, and "now".
//! - `FlowKind`: the config-facing enum, resolved via `build_flow`.
//! - `call`: send + insist on 2xx + attach both payloads to the log.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{error, info};

use crate::backends::{HttpClient, HttpRequest, HttpResponse, send_expecting_success};
use crate::datastore::DataStore;
use crate::diagnostics::{MessageLog, sniff_mime};
use crate::error::{IntegrationError, Result};
use crate::message::Message;
use crate::resolve::{ConfigKey, ResolvedConfig, resolve_lenient};

pub mod category_import;
pub mod full_payment_submission;
pub mod golden_tax_status;
pub mod product_export;
pub mod suretax_force_update;

pub use category_import::CategoryImport;
pub use full_payment_submission::FullPaymentSubmission;
pub use golden_tax_status::GoldenTaxStatus;
pub use product_export::ProductExport;
pub use suretax_force_update::SureTaxForceUpdate;

/// 🧰 Everything a flow may touch besides its message.
#[derive(Debug, Clone)]
pub struct FlowContext {
    pub http: Arc<dyn HttpClient>,
    pub store: Arc<dyn DataStore>,
    pub log: MessageLog,
    /// ⏰ Injected so tests don't depend on what year the CI runner thinks it is.
    pub now: DateTime<Utc>,
}

impl FlowContext {
    pub fn new(http: Arc<dyn HttpClient>, store: Arc<dyn DataStore>) -> Self {
        Self {
            http,
            store,
            log: MessageLog::new(),
            now: Utc::now(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// 🎬 One integration task.
#[async_trait]
pub trait Flow: Send + Sync {
    fn name(&self) -> &'static str;
    fn keys(&self) -> &'static [ConfigKey];
    async fn execute(&self, ctx: &FlowContext, message: Message, config: &ResolvedConfig) -> Result<Message>;
}

/// 🎭 The flows the CLI can be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    CategoryImport,
    SuretaxForceUpdate,
    FullPaymentSubmission,
    GoldenTaxStatus,
    ProductExport,
}

pub fn build_flow(kind: FlowKind) -> Box<dyn Flow> {
    match kind {
        FlowKind::CategoryImport => Box::new(CategoryImport),
        FlowKind::SuretaxForceUpdate => Box::new(SureTaxForceUpdate),
        FlowKind::FullPaymentSubmission => Box::new(FullPaymentSubmission),
        FlowKind::GoldenTaxStatus => Box::new(GoldenTaxStatus),
        FlowKind::ProductExport => Box::new(ProductExport),
    }
}

/// 🚀 Run one message through one flow. The single catch site.
pub async fn run_flow(flow: &dyn Flow, ctx: &FlowContext, message: Message) -> Result<Message> {
    let name = flow.name();
    info!("🚀 {} started ({} byte body)", name, message.body.len());
    let payload = message.body.clone();

    match resolve_and_execute(flow, ctx, message).await {
        Ok(result) => {
            info!("✅ {} finished", name);
            Ok(result)
        }
        Err(err) => {
            ctx.log
                .attach(format!("{name}-error-payload"), payload.as_str(), sniff_mime(&payload))
                .await;
            ctx.log.attach_text(format!("{name}-error"), err.to_string()).await;
            error!("💀 {} failed: {}", name, err);
            Err(IntegrationError::Flow {
                flow: name.to_string(),
                inner: Box::new(err),
            })
        }
    }
}

async fn resolve_and_execute(flow: &dyn Flow, ctx: &FlowContext, message: Message) -> Result<Message> {
    let config = resolve_lenient(&message, flow.keys());
    if !config.defaulted().is_empty() {
        ctx.log
            .attach_text(format!("{}-placeholders", flow.name()), config.placeholder_report())
            .await;
    }
    config.ensure_mandatory()?;
    flow.execute(ctx, message, &config).await
}

/// 📡 Send, insist on 2xx, and pin both directions to the message log as `<step>-request`
/// / `<step>-response`. A failed response body is pinned too, before the error leaves.
pub(crate) async fn call(ctx: &FlowContext, step: &str, request: HttpRequest) -> Result<HttpResponse> {
    if let Some(body) = &request.body {
        ctx.log
            .attach(format!("{step}-request"), body.as_str(), sniff_mime(body))
            .await;
    }
    match send_expecting_success(ctx.http.as_ref(), request).await {
        Ok(response) => {
            ctx.log
                .attach(format!("{step}-response"), response.body.as_str(), sniff_mime(&response.body))
                .await;
            Ok(response)
        }
        Err(err) => {
            if let IntegrationError::Transport { body, .. } = &err {
                ctx.log
                    .attach(format!("{step}-response"), body.as_str(), sniff_mime(body))
                    .await;
            }
            Err(err)
        }
    }
}

/// 📥 Parse a JSON body or say which step choked on it.
pub(crate) fn parse_json(body: &str, what: &str) -> Result<serde_json::Value> {
    serde_json::from_str(body)
        .map_err(|err| IntegrationError::Mapping(format!("{what} is not valid JSON: {err}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::backends::InMemoryHttpClient;
    use crate::datastore::InMemoryDataStore;
    use chrono::TimeZone;

    /// 🧪 A context wired to in-memory doubles, frozen at 2026-10-19 noon UTC.
    pub(crate) fn the_context(http: InMemoryHttpClient, store: InMemoryDataStore) -> FlowContext {
        FlowContext {
            http: Arc::new(http),
            store: Arc::new(store),
            log: MessageLog::new(),
            now: Utc
                .with_ymd_and_hms(2026, 10, 19, 12, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }
}
