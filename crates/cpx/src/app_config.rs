//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment. The file says which flow to run, what the inbound
//! message looks like (body, headers, exchange properties), and how patient the
//! HTTP client should be. Flow configuration keys (URLs, users, secrets) ride on
//! the message's headers and properties, exactly where a flow expects them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::backends::HttpSettings;
use crate::flows::FlowKind;
use crate::message::Message;

/// 📦 One flow, one message, one set of HTTP manners.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub flow: FlowKind,
    #[serde(default)]
    pub message: MessageConfig,
    #[serde(default)]
    pub http: HttpSettings,
}

/// 📨 The inbound message, described declaratively.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MessageConfig {
    /// 📄 Read the body from here. Wins over `body` when both are set.
    pub body_file: Option<PathBuf>,
    /// 📝 Inline body, for the short ones.
    pub body: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl MessageConfig {
    /// 🏗️ Assemble the [`Message`], reading the body file if there is one.
    pub async fn load(&self) -> anyhow::Result<Message> {
        let body = match (&self.body_file, &self.body) {
            (Some(path), _) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("💀 Could not read message body from '{}'", path.display()))?,
            (None, Some(body)) => body.clone(),
            (None, None) => String::new(),
        };
        let message = self
            .headers
            .iter()
            .fold(Message::new(body), |message, (key, value)| message.with_header(key, value));
        Ok(self
            .properties
            .iter()
            .fold(message, |message, (key, value)| message.with_property(key, value)))
    }
}

/// 🚀 Load the config — from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 Merges environment variables (`CPX_*`, `__` separates nesting levels) with an
/// optional TOML file. No file means env vars only. TOML wins on conflicts.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("CPX_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (CPX_*). \
             The file exists in our hearts, but apparently not on disk.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (CPX_*). \
                 No file was provided — this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MESSAGE_ID_PROPERTY;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_test_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("💀 No temp file for us. The filesystem said 'new phone who dis'.");
        file.write_all(contents.as_bytes()).expect("💀 Failed to write test config.");
        file
    }

    #[test]
    fn the_one_where_a_flow_and_its_message_come_out_of_toml() {
        let the_file = write_test_config(
            r#"
            flow = "category_import"

            [message]
            body = '{"categories":["cat1"]}'

            [message.headers]
            user = "admin"

            [message.properties]
            catalogId = "MYCAT"
            SAP_MessageProcessingLogID = "MPL-1"

            [http]
            timeout_secs = 5
            "#,
        );

        let app_config = load_config(Some(the_file.path())).expect("💀 valid TOML should parse");
        assert_eq!(app_config.flow, FlowKind::CategoryImport);
        assert_eq!(app_config.http.timeout_secs, 5);
        assert_eq!(app_config.http.connect_timeout_secs, 10, "untouched knobs keep their defaults");
        assert_eq!(app_config.message.headers.get("user").map(String::as_str), Some("admin"));
        assert_eq!(
            app_config.message.properties.get(MESSAGE_ID_PROPERTY).map(String::as_str),
            Some("MPL-1")
        );
    }

    #[test]
    fn the_one_where_only_the_flow_is_given_and_everything_else_shrugs() {
        let the_file = write_test_config(r#"flow = "product_export""#);
        let app_config = load_config(Some(the_file.path())).expect("💀 minimal TOML should parse");
        assert_eq!(app_config.flow, FlowKind::ProductExport);
        assert!(app_config.message.headers.is_empty());
        assert!(app_config.message.body_file.is_none());
    }

    #[test]
    fn the_one_where_an_unknown_flow_is_a_loud_error() {
        let the_file = write_test_config(r#"flow = "time_travel""#);
        let the_error = load_config(Some(the_file.path())).expect_err("💀 no such flow");
        assert!(format!("{the_error:#}").contains("Failed to parse configuration"));
    }

    #[tokio::test]
    async fn the_one_where_the_body_file_is_read_and_metadata_is_attached() {
        let mut the_body = NamedTempFile::new().expect("temp body");
        the_body.write_all(br#"{"invoiceNo":"INV-1"}"#).expect("write body");

        let the_config = MessageConfig {
            body_file: Some(the_body.path().to_path_buf()),
            body: Some("ignored when a file is given".into()),
            headers: HashMap::from([("user".to_string(), "u".to_string())]),
            properties: HashMap::from([("appKey".to_string(), "k".to_string())]),
        };
        let the_message = the_config.load().await.expect("reads");
        assert_eq!(the_message.body, r#"{"invoiceNo":"INV-1"}"#);
        assert_eq!(the_message.metadata("user"), Some("u"));
        assert_eq!(the_message.metadata("appKey"), Some("k"));
    }

    #[tokio::test]
    async fn the_one_where_a_missing_body_file_says_where_it_looked() {
        let the_config = MessageConfig {
            body_file: Some(PathBuf::from("/definitely/not/here.json")),
            ..MessageConfig::default()
        };
        let the_error = the_config.load().await.expect_err("no such file");
        assert!(the_error.to_string().contains("/definitely/not/here.json"));
    }
}
