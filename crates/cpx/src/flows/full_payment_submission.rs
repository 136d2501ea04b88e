//! 🏛️ Full Payment Submission — payroll, sealed with an IRmark, posted as `text/xml`.
//!
//! The revenue office acknowledges with a GovTalk envelope. We only care about
//! the message details in its header (correlation id, qualifier, function), so
//! that is what the result document carries, plus the IRmark we sent.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::backends::HttpRequest;
use crate::error::{IntegrationError, Result};
use crate::flows::{Flow, FlowContext, call};
use crate::irmark;
use crate::message::Message;
use crate::resolve::{ConfigKey, ResolvedConfig};
use crate::transforms::{FieldMapping, map_json, xml_to_json};
use crate::xml::XmlDocument;

const KEYS: &[ConfigKey] = &[
    ConfigKey::mandatory("hmrcUrl"),
    ConfigKey::mandatory("user"),
    ConfigKey::mandatory("password"),
    ConfigKey::optional("forwardUrl"),
];

const ACK_TABLE: &[FieldMapping] = &[
    FieldMapping::required("CorrelationID", "correlationId"),
    FieldMapping::new("Qualifier", "qualifier"),
    FieldMapping::new("Function", "function"),
    FieldMapping::new("ResponseEndPoint", "responseEndPoint"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct FullPaymentSubmission;

#[async_trait]
impl Flow for FullPaymentSubmission {
    fn name(&self) -> &'static str {
        "full_payment_submission"
    }

    fn keys(&self) -> &'static [ConfigKey] {
        KEYS
    }

    async fn execute(&self, ctx: &FlowContext, message: Message, config: &ResolvedConfig) -> Result<Message> {
        let sealed = irmark::embed_irmark(&message.body)?;
        let mark = irmark::read_irmark(&XmlDocument::parse(&sealed)?).unwrap_or_default();
        info!("🏛️ submission sealed with IRmark {}", mark);

        let (user, password) = (config.require("user")?, config.require("password")?);
        let response = call(
            ctx,
            "fps-submit",
            HttpRequest::post(config.require("hmrcUrl")?)
                .basic_auth(user, password)
                .soap_body(sealed),
        )
        .await?;

        let mut result = map_acknowledgement(&response.body)?;
        result["irmark"] = Value::String(mark);
        let result_body = serde_json::to_string(&result)?;

        if let Some(forward_url) = config.get("forwardUrl") {
            call(
                ctx,
                "fps-forward",
                HttpRequest::post(forward_url)
                    .basic_auth(user, password)
                    .json_body(result_body.clone()),
            )
            .await?;
        }
        Ok(message.replace_body(result_body))
    }
}

/// 🔄 GovTalk acknowledgement `Header/MessageDetails` → flat JSON.
fn map_acknowledgement(xml: &str) -> Result<Value> {
    let document = XmlDocument::parse(xml)?;
    let details = document
        .root
        .find_first("MessageDetails")
        .ok_or_else(|| IntegrationError::missing("MessageDetails", "HMRC acknowledgement"))?;
    map_json(&xml_to_json(details), ACK_TABLE)
}
