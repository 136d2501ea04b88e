//! 🔧 Configuration resolution — reading the room before making the call.
//!
//! Every flow declares the keys it wants. We look each one up in the message
//! metadata exactly once, at entry. Missing optional keys become `None` and get
//! written down for the diagnostics report. Missing mandatory keys stop the show,
//! all of them at once, so nobody has to play whack-a-mole with a config screen.
//!
//! ⚠️ [`PLACEHOLDER`] only ever appears in the diagnostics report. It is never a
//! live value. If you see it in an HTTP request, something has gone very wrong.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{IntegrationError, Result};
use crate::message::Message;

/// 🪧 What the diagnostics report prints for a key nobody set.
pub const PLACEHOLDER: &str = "<not set>";

/// 🔑 One configuration key a flow cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigKey {
    pub name: &'static str,
    pub mandatory: bool,
}

impl ConfigKey {
    pub const fn mandatory(name: &'static str) -> Self {
        Self { name, mandatory: true }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self { name, mandatory: false }
    }
}

/// 📋 The outcome of resolution: every declared key, present or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    values: BTreeMap<&'static str, Option<String>>,
    defaulted: Vec<&'static str>,
    missing_mandatory: Vec<&'static str>,
}

impl ResolvedConfig {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.as_deref())
    }

    /// 🔒 Late mandatory check, for keys that only matter on some code paths.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| IntegrationError::Config {
            missing: vec![name.to_string()],
        })
    }

    /// 🕳️ Keys that were declared but never showed up, in declaration order.
    pub fn defaulted(&self) -> &[&'static str] {
        &self.defaulted
    }

    /// 🔒 Every missing mandatory key in one `Config` error, declaration order.
    pub fn ensure_mandatory(&self) -> Result<()> {
        if self.missing_mandatory.is_empty() {
            return Ok(());
        }
        Err(IntegrationError::Config {
            missing: self.missing_mandatory.iter().map(|key| key.to_string()).collect(),
        })
    }

    /// 🪧 `key=<not set>` per defaulted key. Goes into the message log, nowhere else.
    pub fn placeholder_report(&self) -> String {
        self.defaulted
            .iter()
            .map(|key| format!("{key}={PLACEHOLDER}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 🔍 Resolve `keys` against the message metadata.
///
/// Optional keys never fail. Mandatory keys that are missing come back together
/// in one `IntegrationError::Config`, in the order they were declared.
pub fn resolve(message: &Message, keys: &[ConfigKey]) -> Result<ResolvedConfig> {
    let resolved = resolve_lenient(message, keys);
    resolved.ensure_mandatory()?;
    Ok(resolved)
}

/// 🪧 Look every key up and write down what is missing, without failing yet.
/// Pair with [`ResolvedConfig::ensure_mandatory`].
pub fn resolve_lenient(message: &Message, keys: &[ConfigKey]) -> ResolvedConfig {
    let mut resolved = ResolvedConfig::default();
    for key in keys {
        let value = message.metadata(key.name).map(str::to_string);
        if value.is_none() {
            debug!("🪧 config key '{}' not set, using placeholder", key.name);
            resolved.defaulted.push(key.name);
            if key.mandatory {
                resolved.missing_mandatory.push(key.name);
            }
        }
        resolved.values.insert(key.name, value);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    const THE_KEYS: &[ConfigKey] = &[
        ConfigKey::mandatory("targetUrl"),
        ConfigKey::optional("timeout"),
        ConfigKey::optional("unifyJurisdiction"),
    ];

    #[test]
    fn the_one_where_absent_optional_keys_get_the_placeholder_and_no_drama() {
        let the_message = Message::new("").with_header("targetUrl", "http://x");
        let the_config = resolve(&the_message, THE_KEYS).expect("optional keys never fail");

        assert_eq!(the_config.get("targetUrl"), Some("http://x"));
        assert_eq!(the_config.get("timeout"), None);
        assert_eq!(the_config.defaulted(), &["timeout", "unifyJurisdiction"]);
        assert_eq!(
            the_config.placeholder_report(),
            "timeout=<not set>\nunifyJurisdiction=<not set>"
        );
    }

    #[test]
    fn the_one_where_every_missing_mandatory_key_is_reported_together() {
        let keys = [
            ConfigKey::mandatory("user"),
            ConfigKey::optional("nice_to_have"),
            ConfigKey::mandatory("password"),
        ];
        match resolve(&Message::new(""), &keys) {
            Err(IntegrationError::Config { missing }) => {
                assert_eq!(missing, vec!["user".to_string(), "password".to_string()]);
            }
            honestly_who_knows => panic!("💀 expected a config error, got {honestly_who_knows:?}"),
        }
    }

    #[test]
    fn the_one_where_lenient_resolution_keeps_the_report_even_when_mandatory_keys_are_gone() {
        let the_config = resolve_lenient(&Message::new(""), THE_KEYS);
        assert_eq!(the_config.defaulted(), &["targetUrl", "timeout", "unifyJurisdiction"]);
        assert!(the_config.placeholder_report().starts_with("targetUrl=<not set>"));
        assert!(matches!(
            the_config.ensure_mandatory(),
            Err(IntegrationError::Config { ref missing }) if missing == &vec!["targetUrl".to_string()]
        ));
    }

    #[test]
    fn the_one_where_require_is_the_late_bouncer() {
        let the_config = resolve(&Message::new("").with_property("targetUrl", "u"), THE_KEYS)
            .expect("mandatory key is present");
        assert_eq!(the_config.require("targetUrl").ok(), Some("u"));
        assert!(matches!(
            the_config.require("timeout"),
            Err(IntegrationError::Config { ref missing }) if missing == &vec!["timeout".to_string()]
        ));
    }

    #[test]
    fn the_one_where_nothing_is_defaulted_and_the_report_is_empty() {
        let the_message = Message::new("")
            .with_header("targetUrl", "a")
            .with_header("timeout", "5")
            .with_property("unifyJurisdiction", "X");
        let the_config = resolve(&the_message, THE_KEYS).expect("all keys present");
        assert!(the_config.defaulted().is_empty());
        assert_eq!(the_config.placeholder_report(), "");
    }
}
