use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExtensionConfig {
    #[serde(alias = "RPC")]
    Rpc {
        host: String,
        port: u16,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    #[serde(alias = "REST", alias = "rest")]
    Http {
        url: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl ExtensionConfig {
    pub fn timeout(&self) -> Duration {
        match self {
            ExtensionConfig::Rpc { timeout_ms, .. } | ExtensionConfig::Http { timeout_ms, .. } => {
                Duration::from_millis(*timeout_ms)
            }
        }
    }
}
