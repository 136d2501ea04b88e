//! 🧧 Golden Tax invoice status — ask the tax platform, tell the ERP, tidy up.
//!
//! The platform wants every request signed twice: an HMAC of the body in
//! `signature`, and a short-lived HS256 token in `JWT-Token`. Belt, braces.
//!
//! The raw answer is parked in the staging store before the forward, and removed
//! again once the ERP has taken it. If the forward dies, the answer stays on the
//! shelf for a human.

use async_trait::async_trait;
use chrono::Duration;
use serde_json::Value;
use tracing::{debug, info};

use crate::backends::HttpRequest;
use crate::datastore::entry_id;
use crate::error::Result;
use crate::flows::{Flow, FlowContext, call, parse_json};
use crate::message::Message;
use crate::resolve::{ConfigKey, ResolvedConfig};
use crate::signing::{JWT_TOKEN_HEADER, SIGNATURE_HEADER, hmac_sha256_hex, jwt_token};
use crate::transforms::{FieldMapping, StatusCode, get_string, map_json, map_json_omitting};

const KEYS: &[ConfigKey] = &[
    ConfigKey::mandatory("statusUrl"),
    ConfigKey::mandatory("appKey"),
    ConfigKey::mandatory("appSecret"),
    ConfigKey::mandatory("forwardUrl"),
    ConfigKey::mandatory("user"),
    ConfigKey::mandatory("password"),
    ConfigKey::optional("dataStoreName"),
];

const DEFAULT_STORE: &str = "GoldenTaxStatus";
const APP_KEY_HEADER: &str = "appKey";

const INPUT_TABLE: &[FieldMapping] = &[
    FieldMapping::required("invoiceNo", "invoiceNo"),
    FieldMapping::required("companyCode", "companyCode"),
    FieldMapping::new("invoiceDate", "invoiceDate"),
];

const RESPONSE_TABLE: &[FieldMapping] = &[
    FieldMapping::required("data.invoiceNo", "invoiceNo"),
    FieldMapping::new("data.invoiceCode", "invoiceCode"),
    FieldMapping::new("data.pdfUrl", "pdfUrl"),
    FieldMapping::new("message", "message"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct GoldenTaxStatus;

#[async_trait]
impl Flow for GoldenTaxStatus {
    fn name(&self) -> &'static str {
        "golden_tax_status"
    }

    fn keys(&self) -> &'static [ConfigKey] {
        KEYS
    }

    async fn execute(&self, ctx: &FlowContext, message: Message, config: &ResolvedConfig) -> Result<Message> {
        let input = map_json_omitting(&parse_json(&message.body, "invoice query")?, INPUT_TABLE)?;
        let company_code = get_string(&input, "companyCode").unwrap_or_default();
        let request_body = serde_json::to_string(&input)?;

        let (app_key, app_secret) = (config.require("appKey")?, config.require("appSecret")?);
        let signature = hmac_sha256_hex(app_secret, &request_body)?;
        let token = jwt_token(app_secret, app_key, &company_code, Duration::minutes(5), ctx.now)?;
        debug!("🧧 signed invoice query for company {}", company_code);

        let response = call(
            ctx,
            "golden-tax",
            HttpRequest::post(config.require("statusUrl")?)
                .header(APP_KEY_HEADER, app_key)
                .header(SIGNATURE_HEADER, signature)
                .header(JWT_TOKEN_HEADER, token)
                .json_body(request_body),
        )
        .await?;

        let result = map_response(&parse_json(&response.body, "Golden Tax response")?)?;
        let result_body = serde_json::to_string(&result)?;
        info!("🧧 invoice {} is {}", result["invoiceNo"], result["status"]);

        let store = config.get("dataStoreName").unwrap_or(DEFAULT_STORE);
        let entry = entry_id(&message);
        ctx.store
            .put(store, &entry, response.body.into_bytes(), true)
            .await?;

        call(
            ctx,
            "golden-tax-forward",
            HttpRequest::post(config.require("forwardUrl")?)
                .basic_auth(config.require("user")?, config.require("password")?)
                .json_body(result_body.clone()),
        )
        .await?;

        let removed = ctx.store.delete(store, &entry).await?;
        debug!("🧹 staged answer {} removed: {}", entry, removed);
        Ok(message.replace_body(result_body))
    }
}

/// 🔄 `data.*` fields plus a status: `data.status` when present, else the top-level `code`.
fn map_response(response: &Value) -> Result<Value> {
    let mut result = map_json(response, RESPONSE_TABLE)?;
    let code = get_string(response, "data.status")
        .filter(|status| !status.trim().is_empty())
        .or_else(|| get_string(response, "code"))
        .unwrap_or_default();
    result["status"] = Value::String(StatusCode::from_code(&code).as_str().to_string());
    Ok(result)
}
