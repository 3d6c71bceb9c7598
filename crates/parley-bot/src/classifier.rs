use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use parley_core::{Classifier, Prediction, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const CLASSIFIER_FILE: &str = "clf.yml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub classification: Vec<ClassificationSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationSpec {
    pub command: String,
    #[serde(default)]
    pub texts: Vec<String>,
}

/// Lowercase, strip punctuation and collapse whitespace.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exact-match lookup of normalized training texts.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    table: HashMap<String, String>,
}

impl KeywordClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let mut table = HashMap::new();
        for spec in config.classification {
            for text in spec.texts {
                let key = normalize(&text);
                if key.is_empty() {
                    continue;
                }
                if let Some(previous) = table.insert(key, spec.command.clone()) {
                    if previous != spec.command {
                        warn!(
                            text = %text,
                            previous = %previous,
                            command = %spec.command,
                            "Training text listed under two commands, keeping the later one"
                        );
                    }
                }
            }
        }
        Self { table }
    }

    pub fn from_yaml(yaml_content: &str) -> Result<Self> {
        let config: ClassifierConfig = serde_yaml::from_str(yaml_content)?;
        Ok(Self::new(config))
    }

    /// Read `clf.yml` from a bot directory. Without one every prediction abstains.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(CLASSIFIER_FILE);
        if !path.exists() {
            warn!(path = %path.display(), "clf.yml not found, every message will be unsure");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let classifier = Self::from_yaml(&content)?;
        info!(texts = classifier.len(), "Loaded classifier");
        Ok(classifier)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Distinct command labels this classifier can predict.
    pub fn commands(&self) -> Vec<&str> {
        let mut commands: Vec<&str> = self.table.values().map(String::as_str).collect();
        commands.sort_unstable();
        commands.dedup();
        commands
    }

    pub fn classify(&self, text: &str) -> Prediction {
        match self.table.get(&normalize(text)) {
            Some(command) => Prediction::new(command.clone(), 1.0),
            None => Prediction::abstain(),
        }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn predict(&self, text: &str) -> Result<Prediction> {
        Ok(self.classify(text))
    }
}
