//! 💀 Errors — the three flavors of "it didn't work".
//!
//! 🎬 Every integration flow fails in exactly one of three ways:
//! somebody forgot to configure it, somebody else's server said no,
//! or the payload showed up wearing the wrong shape. That's it. That's the list.
//! We tried to think of a fourth. We couldn't. We were tired.
//!
//! 🧠 Knowledge graph:
//! - `IntegrationError` is the one tagged error type every module returns.
//! - `ErrorKind` folds the variants back into the three buckets (configuration,
//!   transport, validation) for callers that only care which team to page.
//! - `IntegrationError::Flow` is the single top-level wrapper added by
//!   `flows::run_flow`. It is never constructed anywhere else. 🦆

use thiserror::Error;

/// 🏷️ Result alias so signatures stay shorter than a standup meeting.
pub type Result<T, E = IntegrationError> = std::result::Result<T, E>;

/// 💀 Everything that can go wrong while shuttling one message from A to B.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// 🔧 One or more mandatory configuration keys never showed up.
    #[error("missing mandatory configuration: {}", missing.join(", "))]
    Config { missing: Vec<String> },

    /// 📡 The remote end answered, and the answer was not 2xx.
    #[error("HTTP {status} from {url}: {body}")]
    Transport {
        status: u16,
        url: String,
        body: String,
    },

    /// 🔌 The request never got an answer at all. DNS, TLS, a cable, a mood.
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// 🕳️ The response parsed fine but a field we need is not in it.
    #[error("missing field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// 🚫 Input data is malformed (bad geocode, bad date, bad number).
    #[error("validation failed: {0}")]
    Validation(String),

    /// 🔄 Payload could not be parsed or produced in the expected format.
    #[error("mapping failed: {0}")]
    Mapping(String),

    /// 🗄️ The key-value store refused the operation.
    #[error("datastore error: {0}")]
    Datastore(String),

    /// 🎁 The wrapper `run_flow` puts around whatever went wrong inside a flow.
    /// The inner error is already in the message, so it is not chained as a source.
    #[error("{flow} failed: {inner}")]
    Flow {
        flow: String,
        inner: Box<IntegrationError>,
    },
}

/// 🗂️ The three buckets from the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    Validation,
}

impl IntegrationError {
    /// 🗂️ Which bucket does this belong to? `Flow` defers to whatever it wraps.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntegrationError::Config { .. } => ErrorKind::Configuration,
            IntegrationError::Transport { .. }
            | IntegrationError::Network { .. }
            | IntegrationError::MissingField { .. }
            | IntegrationError::Datastore(_) => ErrorKind::Transport,
            IntegrationError::Validation(_) | IntegrationError::Mapping(_) => {
                ErrorKind::Validation
            }
            IntegrationError::Flow { inner, .. } => inner.kind(),
        }
    }

    /// 🔍 The HTTP status hiding somewhere in here, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            IntegrationError::Transport { status, .. } => Some(*status),
            IntegrationError::Flow { inner, .. } => inner.http_status(),
            _ => None,
        }
    }

    pub(crate) fn missing(field: impl Into<String>, context: impl Into<String>) -> Self {
        IntegrationError::MissingField {
            field: field.into(),
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for IntegrationError {
    fn from(err: serde_json::Error) -> Self {
        IntegrationError::Mapping(format!("JSON: {err}"))
    }
}

impl From<quick_xml::Error> for IntegrationError {
    fn from(err: quick_xml::Error) -> Self {
        IntegrationError::Mapping(format!("XML: {err}"))
    }
}
