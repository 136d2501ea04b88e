//! 🧮 SureTax force update — recompute, tell the tax engine, tell the ERP.
//!
//! The ERP hands us minor-unit line items. [`crate::suretax`] turns them into an
//! adjustment request. The tax engine answers with a transaction id and a Y/N.
//! We map that into a small result document, park it in the staging store, and
//! forward it downstream.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::backends::HttpRequest;
use crate::datastore::entry_id;
use crate::error::{IntegrationError, Result};
use crate::flows::{Flow, FlowContext, call, parse_json};
use crate::message::Message;
use crate::resolve::{ConfigKey, ResolvedConfig};
use crate::suretax::{self, SureTaxAccount, TaxLineItem};
use crate::transforms::{FieldMapping, StatusCode, get_string, map_json};

const KEYS: &[ConfigKey] = &[
    ConfigKey::mandatory("sureTaxUrl"),
    ConfigKey::mandatory("clientNumber"),
    ConfigKey::mandatory("businessUnit"),
    ConfigKey::mandatory("validationKey"),
    ConfigKey::optional("unifyJurisdiction"),
    ConfigKey::mandatory("forwardUrl"),
    ConfigKey::mandatory("user"),
    ConfigKey::mandatory("password"),
    ConfigKey::optional("dataStoreName"),
];

const DEFAULT_STORE: &str = "SureTaxForceUpdate";

const RESPONSE_TABLE: &[FieldMapping] = &[
    FieldMapping::required("TransId", "transactionId"),
    FieldMapping::new("ResponseCode", "responseCode"),
    FieldMapping::new("HeaderMessage", "message"),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForceUpdateInput {
    #[serde(default = "default_currency_decimals")]
    currency_decimals: u32,
    #[serde(default)]
    items: Vec<TaxLineItem>,
}

fn default_currency_decimals() -> u32 {
    2
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SureTaxForceUpdate;

#[async_trait]
impl Flow for SureTaxForceUpdate {
    fn name(&self) -> &'static str {
        "suretax_force_update"
    }

    fn keys(&self) -> &'static [ConfigKey] {
        KEYS
    }

    async fn execute(&self, ctx: &FlowContext, message: Message, config: &ResolvedConfig) -> Result<Message> {
        let input: ForceUpdateInput = serde_json::from_str(&message.body)
            .map_err(|err| IntegrationError::Mapping(format!("force update input: {err}")))?;
        if input.items.is_empty() {
            return Err(IntegrationError::Validation("force update has no line items".into()));
        }

        let adjustment = suretax::calculate(
            &input.items,
            input.currency_decimals,
            suretax::unify_flag(config.get("unifyJurisdiction")),
            ctx.today(),
        )?;
        let account = SureTaxAccount {
            client_number: config.require("clientNumber")?,
            business_unit: config.require("businessUnit")?,
            validation_key: config.require("validationKey")?,
        };
        let entry = entry_id(&message);
        let request_body = serde_json::to_string(&adjustment.to_request(&account, &entry))?;

        let (user, password) = (config.require("user")?, config.require("password")?);
        let response = call(
            ctx,
            "suretax",
            HttpRequest::post(config.require("sureTaxUrl")?)
                .basic_auth(user, password)
                .json_body(request_body),
        )
        .await?;

        let result = map_response(&parse_json(&response.body, "SureTax response")?, adjustment.data_year)?;
        let result_body = serde_json::to_string(&result)?;
        info!(
            "🧮 SureTax answered {} for {} line(s)",
            result["status"], adjustment.items.len()
        );

        let store = config.get("dataStoreName").unwrap_or(DEFAULT_STORE);
        ctx.store
            .put(store, &entry, result_body.clone().into_bytes(), true)
            .await?;

        call(
            ctx,
            "suretax-forward",
            HttpRequest::post(config.require("forwardUrl")?)
                .basic_auth(user, password)
                .json_body(result_body.clone()),
        )
        .await?;

        Ok(message.replace_body(result_body))
    }
}

/// 🔄 SureTax `Successful: Y|N` → `S|E` → SUCCESS/ERROR, plus the mapped fields.
fn map_response(response: &Value, data_year: i32) -> Result<Value> {
    let mut result = map_json(response, RESPONSE_TABLE)?;
    let code = match get_string(response, "Successful").as_deref().map(str::trim) {
        Some("Y") | Some("y") => "S",
        _ => "E",
    };
    result["status"] = Value::String(StatusCode::from_code(code).as_str().to_string());
    result["dataYear"] = Value::String(data_year.to_string());
    Ok(result)
}
