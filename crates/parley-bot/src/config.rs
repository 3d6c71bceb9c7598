use std::path::Path;

use parley_core::{ParleyError, Result};
use parley_extension::ExtensionConfig;
use parley_store::StoreConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_BOT_NAME: &str = "botto";
pub const BOT_FILE: &str = "bot.yml";

/// Contents of `bot.yml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Predictions below this confidence are treated as abstentions.
    #[serde(default)]
    pub threshold: f64,

    #[serde(default, alias = "extensions")]
    pub extension: Option<ExtensionConfig>,

    #[serde(default)]
    pub store: StoreConfig,
}

fn default_bot_name() -> String {
    DEFAULT_BOT_NAME.to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            threshold: 0.0,
            extension: None,
            store: StoreConfig::default(),
        }
    }
}

impl BotConfig {
    pub fn from_yaml(yaml_content: &str) -> Result<Self> {
        let config: BotConfig = serde_yaml::from_str(yaml_content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `bot.yml` from a bot directory. A missing file yields the defaults.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(BOT_FILE);
        if !path.exists() {
            warn!(path = %path.display(), "bot.yml not found, using default values");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ParleyError::Config(format!(
                "threshold must be between 0 and 1, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// The configured name, or the default when left blank.
    pub fn name(&self) -> &str {
        let name = self.bot_name.trim();
        if name.is_empty() { DEFAULT_BOT_NAME } else { name }
    }
}
