use std::path::Path;

use parley_core::{Answer, MessageSpec, ParleyError, Result};
use serde::{Deserialize, Serialize};

/// Reserved name matching any state or any command during lookup.
pub const WILDCARD: &str = "any";

/// A string message starting with this prefix names an extension function.
pub const EXTENSION_PREFIX: &str = "ext_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsmConfig {
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub transition: TransitionSpec,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<SlotSpec>,
    pub message: MessageSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub from: String,
    pub into: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SlotMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

impl SlotSpec {
    /// A slot block with neither name nor mode is treated as absent.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.mode.is_none() && self.regex.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotMode {
    /// Store the whole raw input verbatim.
    WholeText,
    /// Declared in configurations but rejected at compile time.
    Regex,
}

/// Answers used when a turn cannot be resolved normally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_unknown")]
    pub unknown: String,
    #[serde(default = "default_unsure")]
    pub unsure: String,
    #[serde(default = "default_error")]
    pub error: String,
}

fn default_unknown() -> String {
    "Not sure I understood, try again please.".to_string()
}

fn default_unsure() -> String {
    "Not sure I understood, try again please.".to_string()
}

fn default_error() -> String {
    "An error occurred, please try again.".to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            unknown: default_unknown(),
            unsure: default_unsure(),
            error: default_error(),
        }
    }
}

impl Defaults {
    pub fn unknown_answers(&self) -> Vec<Answer> {
        vec![Answer::text(&self.unknown)]
    }

    pub fn unsure_answers(&self) -> Vec<Answer> {
        vec![Answer::text(&self.unsure)]
    }

    pub fn error_answers(&self) -> Vec<Answer> {
        vec![Answer::text(&self.error)]
    }
}

impl FsmConfig {
    pub fn from_yaml(yaml_content: &str) -> Result<Self> {
        let config: FsmConfig = serde_yaml::from_str(yaml_content)?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ParleyError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }
}
