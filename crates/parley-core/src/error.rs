use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extension error: {0}")]
    Extension(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ParleyError>;

impl ParleyError {
    /// Only configuration problems are fatal; everything else is absorbed per turn.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ParleyError::Config(_) | ParleyError::Yaml(_) | ParleyError::IoError(_)
        )
    }
}
