use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Classifier output. An empty `label` means no confident match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    pub fn abstain() -> Self {
        Self::new("", 0.0)
    }

    pub fn is_abstention(&self) -> bool {
        self.label.is_empty()
    }
}

/// Maps free text to a command label.
///
/// Implementations are external to the engine (naive Bayes, remote NLU, keyword
/// tables). The bot treats any prediction below its configured threshold as an
/// abstention.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn predict(&self, text: &str) -> Result<Prediction>;
}
