//! 🚦 Status codes — the entire business-logic budget of this codebase.
//!
//! `"S"` means SUCCESS. `"E"` means ERROR. Everything else means we have no idea,
//! and we say so out loud instead of guessing.

use serde::Serialize;

/// 🚦 Upstream one-letter status, translated for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusCode {
    Success,
    Error,
    Unknown,
}

// 📐 The table. Two rows. Add a third and you owe the team a design review.
const STATUS_TABLE: &[(&str, StatusCode)] = &[("S", StatusCode::Success), ("E", StatusCode::Error)];

impl StatusCode {
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        STATUS_TABLE
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(code))
            .map(|(_, status)| *status)
            .unwrap_or(StatusCode::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Success => "SUCCESS",
            StatusCode::Error => "ERROR",
            StatusCode::Unknown => "UNKNOWN",
        }
    }
}
