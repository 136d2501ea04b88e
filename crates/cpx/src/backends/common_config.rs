//! ⏱️ **HTTP settings** — the only knobs the outbound client has.
//!
//! Connect timeout and overall request timeout. No retries, no backoff, no
//! circuit breaker. If the endpoint is down, the message fails and the platform
//! decides what to do about it. That is somebody else's pager.

use std::time::Duration;

use serde::Deserialize;

/// ⏱️ Timeouts for every outbound call made by [`super::ReqwestHttpClient`].
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HttpSettings {
    /// 🔌 Seconds to wait for a TCP/TLS handshake.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// ⏳ Seconds to wait for the whole request/response round trip.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// 🔌 10 seconds. If the handshake takes longer, the endpoint is not having a good day.
fn default_connect_timeout_secs() -> u64 {
    10
}

// ⏳ 30 seconds. SOAP endpoints are slow, we are not monsters.
fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
