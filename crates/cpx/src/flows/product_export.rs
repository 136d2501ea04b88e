//! 📦 Product export — PIM has the truth, CDC wants a copy, signed.
//!
//! Products come either in the message body (`{"products": [...]}`) or, when the
//! body is empty, fresh from the PIM with an `X-PIM-TOKEN`. A body without
//! `products` is refused. Each product goes through the table below, and the
//! batch is POSTed to CDC with `apiKey` and `timestamp` in the query string and a
//! `CDCSignature` over both.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::backends::HttpRequest;
use crate::error::{IntegrationError, Result};
use crate::flows::{Flow, FlowContext, call, parse_json};
use crate::message::Message;
use crate::resolve::{ConfigKey, ResolvedConfig};
use crate::signing::{CDC_SIGNATURE_HEADER, PIM_TOKEN_HEADER, cdc_signature};
use crate::transforms::{FieldMapping, get_path, map_each};

const KEYS: &[ConfigKey] = &[
    ConfigKey::mandatory("pimUrl"),
    ConfigKey::mandatory("pimToken"),
    ConfigKey::mandatory("cdcUrl"),
    ConfigKey::mandatory("cdcApiKey"),
    ConfigKey::mandatory("cdcSecret"),
];

const PRODUCTS: &str = "products";

const PRODUCT_TABLE: &[FieldMapping] = &[
    FieldMapping::required("code", "productId"),
    FieldMapping::new("name", "title"),
    FieldMapping::new("price.amount", "price.value"),
    FieldMapping::new("price.currency", "price.currency"),
    FieldMapping::new("category", "category"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ProductExport;

#[async_trait]
impl Flow for ProductExport {
    fn name(&self) -> &'static str {
        "product_export"
    }

    fn keys(&self) -> &'static [ConfigKey] {
        KEYS
    }

    async fn execute(&self, ctx: &FlowContext, message: Message, config: &ResolvedConfig) -> Result<Message> {
        let catalog = match inline_products(&message.body)? {
            Some(catalog) => catalog,
            None => {
                let response = call(
                    ctx,
                    "pim",
                    HttpRequest::get(config.require("pimUrl")?)
                        .header(PIM_TOKEN_HEADER, config.require("pimToken")?),
                )
                .await?;
                parse_json(&response.body, "PIM product list")?
            }
        };

        let products = map_each(&catalog, PRODUCTS, PRODUCT_TABLE)?;
        info!("📦 exporting {} product(s) to CDC", products.len());
        let payload = serde_json::to_string(&json!({ PRODUCTS: products }))?;

        let cdc_url = config.require("cdcUrl")?;
        let api_key = config.require("cdcApiKey")?;
        let timestamp = ctx.now.timestamp().to_string();
        let params = [("apiKey", api_key), ("timestamp", timestamp.as_str())];
        let signature = cdc_signature(config.require("cdcSecret")?, "POST", cdc_url, &params)?;
        debug!("📦 CDC request signed at {}", timestamp);

        let response = call(
            ctx,
            "cdc",
            HttpRequest::post(with_query(cdc_url, &params))
                .header(CDC_SIGNATURE_HEADER, signature)
                .json_body(payload),
        )
        .await?;
        Ok(message.replace_body(response.body))
    }
}

/// 📥 Empty body: ask the PIM. Anything else must carry `products` itself.
fn inline_products(body: &str) -> Result<Option<Value>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value = parse_json(body, "product export input")?;
    match get_path(&value, PRODUCTS) {
        Some(_) => Ok(Some(value)),
        None => Err(IntegrationError::missing(PRODUCTS, "product export input")),
    }
}

fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}
