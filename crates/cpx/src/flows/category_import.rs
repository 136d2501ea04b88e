//! 🗂️ Category import — a list of codes in, one catalog-version XML out.
//!
//! The commerce backend wants categories grouped under the catalog version they
//! belong to, and wants each one's `integrationKey` to equal its `code`. Six
//! scripts disagreed about the XML declaration. The mock endpoint's expected
//! payload had one, so we send one.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::backends::HttpRequest;
use crate::error::{IntegrationError, Result};
use crate::flows::{Flow, FlowContext, call, parse_json};
use crate::message::Message;
use crate::resolve::{ConfigKey, ResolvedConfig};
use crate::transforms::{FieldMapping, json_to_xml, map_json_omitting};
use crate::xml::{XmlDocument, XmlElement};

const KEYS: &[ConfigKey] = &[
    ConfigKey::mandatory("catalogId"),
    ConfigKey::mandatory("catalogVersion"),
    ConfigKey::mandatory("targetUrl"),
    ConfigKey::mandatory("user"),
    ConfigKey::mandatory("password"),
];

// 📐 One source code, two target fields. Yes, on purpose.
const CATEGORY_TABLE: &[FieldMapping] = &[
    FieldMapping::required("code", "code"),
    FieldMapping::required("code", "integrationKey"),
    FieldMapping::new("name", "name"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryImport;

#[async_trait]
impl Flow for CategoryImport {
    fn name(&self) -> &'static str {
        "category_import"
    }

    fn keys(&self) -> &'static [ConfigKey] {
        KEYS
    }

    async fn execute(&self, ctx: &FlowContext, message: Message, config: &ResolvedConfig) -> Result<Message> {
        let source = parse_json(&message.body, "category list")?;
        let codes = category_items(&source)?;
        debug!("🗂️ importing {} categories", codes.len());

        let document = build_category_document(&codes, config.require("catalogId")?, config.require("catalogVersion")?)?;
        let payload = document.to_canonical_string();

        let request = HttpRequest::post(config.require("targetUrl")?)
            .basic_auth(config.require("user")?, config.require("password")?)
            .xml_body(payload);
        let response = call(ctx, "category-import", request).await?;
        Ok(message.replace_body(response.body))
    }
}

/// 📋 Accept `{"categories": [...]}` or a bare array; items are strings or `{code, name}`.
fn category_items(source: &Value) -> Result<Vec<Value>> {
    let items = match source {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("categories") {
            Some(Value::Array(items)) => items,
            _ => return Err(IntegrationError::missing("categories", "category list")),
        },
        _ => {
            return Err(IntegrationError::Mapping(
                "category list must be an array or an object with 'categories'".into(),
            ));
        }
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(code) => Ok(json!({ "code": code })),
            Value::Object(_) => Ok(item.clone()),
            other => Err(IntegrationError::Mapping(format!(
                "category entry {other} is neither a code nor an object"
            ))),
        })
        .collect()
}

/// 🏗️ `<Categories><catalogVersion>…<Category/>…</catalogVersion></Categories>`
pub fn build_category_document(items: &[Value], catalog_id: &str, catalog_version: &str) -> Result<XmlDocument> {
    let mut version_block = XmlElement::new("catalogVersion")
        .child(XmlElement::new("catalog").child(XmlElement::leaf("id", catalog_id)))
        .child(XmlElement::leaf("version", catalog_version));
    for item in items {
        let mapped = map_json_omitting(item, CATEGORY_TABLE)?;
        version_block.push(json_to_xml("Category", &mapped));
    }
    Ok(XmlDocument::new(XmlElement::new("Categories").child(version_block)))
}
