use std::sync::Arc;
use std::time::Duration;

use parley_core::{Classifier, ParleyError, Result, SessionStore};
use parley_extension::{ExtensionConfig, ExtensionGateway, ExtensionTransport, create_gateway};
use parley_fsm::Domain;
use parley_store::{SenderLocks, StoreConfig, create_store};
use tracing::info;

use crate::bot::Bot;
use crate::config::{BotConfig, DEFAULT_BOT_NAME};

pub struct BotBuilder {
    name: Option<String>,
    domain: Option<Domain>,
    classifier: Option<Arc<dyn Classifier>>,
    threshold: f64,
    store_config: Option<StoreConfig>,
    store: Option<Arc<dyn SessionStore>>,
    extension_config: Option<ExtensionConfig>,
    gateway: Option<ExtensionGateway>,
    extension_timeout: Option<Duration>,
    lock_shards: Option<usize>,
}

impl BotBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            domain: None,
            classifier: None,
            threshold: 0.0,
            store_config: None,
            store: None,
            extension_config: None,
            gateway: None,
            extension_timeout: None,
            lock_shards: None,
        }
    }

    pub fn from_config(config: BotConfig) -> Self {
        let name = config.name().to_string();
        Self {
            name: Some(name),
            threshold: config.threshold,
            store_config: Some(config.store),
            extension_config: config.extension,
            ..Self::new()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn store_config(mut self, config: StoreConfig) -> Self {
        self.store_config = Some(config);
        self
    }

    /// Use this store instead of one built from the store configuration.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn extension_config(mut self, config: ExtensionConfig) -> Self {
        self.extension_config = Some(config);
        self
    }

    pub fn gateway(mut self, gateway: ExtensionGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Wrap a transport in a gateway with the default timeout.
    pub fn transport(self, transport: Arc<dyn ExtensionTransport>) -> Self {
        self.gateway(ExtensionGateway::new(transport))
    }

    /// Overrides the timeout of whichever gateway `build` ends up with.
    pub fn extension_timeout(mut self, timeout: Duration) -> Self {
        self.extension_timeout = Some(timeout);
        self
    }

    pub fn lock_shards(mut self, shards: usize) -> Self {
        self.lock_shards = Some(shards);
        self
    }

    pub fn build(self) -> Result<Bot> {
        let domain = self
            .domain
            .ok_or_else(|| ParleyError::Config("A domain is required".into()))?;
        let classifier = self
            .classifier
            .ok_or_else(|| ParleyError::Config("A classifier is required".into()))?;

        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ParleyError::Config(format!(
                "threshold must be between 0 and 1, got {}",
                self.threshold
            )));
        }

        let store = match self.store {
            Some(store) => store,
            None => create_store(&self.store_config.unwrap_or_default())?,
        };

        let gateway = match (self.gateway, self.extension_config) {
            (Some(gateway), _) => Some(gateway),
            (None, Some(config)) => Some(create_gateway(&config)?),
            (None, None) => None,
        };
        let gateway = match self.extension_timeout {
            Some(timeout) => gateway.map(|g| g.with_timeout(timeout)),
            None => gateway,
        };

        let locks = match self.lock_shards {
            Some(shards) => SenderLocks::with_shards(shards),
            None => SenderLocks::new(),
        };

        let name = self.name.unwrap_or_else(|| DEFAULT_BOT_NAME.to_string());
        info!(
            bot = %name,
            extension = gateway.as_ref().map(|g| g.transport_name()).unwrap_or("none"),
            "Bot ready"
        );

        let view = domain.view();
        Ok(Bot {
            name,
            domain: Arc::new(domain),
            view,
            classifier,
            store,
            locks,
            gateway,
            threshold: self.threshold,
        })
    }
}

impl Default for BotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::KeywordClassifier;
    use parley_store::MemoryStore;

    const FSM: &str = r#"
states: [idle]
commands: [greet]
functions:
  - transition: {from: idle, into: idle}
    command: greet
    message: "Hi!"
"#;

    fn classifier() -> Arc<dyn Classifier> {
        Arc::new(KeywordClassifier::default())
    }

    #[test]
    fn test_requires_domain_and_classifier() {
        let err = BotBuilder::new().classifier(classifier()).build().err().unwrap();
        assert!(matches!(err, ParleyError::Config(msg) if msg.contains("domain")));

        let err = BotBuilder::new()
            .domain(Domain::from_yaml(FSM).unwrap())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ParleyError::Config(msg) if msg.contains("classifier")));
    }

    #[test]
    fn test_defaults() {
        let bot = BotBuilder::new()
            .domain(Domain::from_yaml(FSM).unwrap())
            .classifier(classifier())
            .build()
            .unwrap();
        assert_eq!(bot.name(), DEFAULT_BOT_NAME);
        assert_eq!(bot.threshold(), 0.0);
        assert!(!bot.has_extension());
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let err = BotBuilder::new()
            .domain(Domain::from_yaml(FSM).unwrap())
            .classifier(classifier())
            .threshold(-0.1)
            .build()
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_extension_config_fails() {
        let err = BotBuilder::new()
            .domain(Domain::from_yaml(FSM).unwrap())
            .classifier(classifier())
            .extension_config(ExtensionConfig::Http {
                url: "ftp://nope".into(),
                timeout_ms: 100,
            })
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ParleyError::Config(_)));
    }

    #[tokio::test]
    async fn test_injected_store_is_used() {
        let store = Arc::new(MemoryStore::new());
        let bot = BotBuilder::new()
            .name("greeter")
            .domain(Domain::from_yaml(FSM).unwrap())
            .classifier(Arc::new(
                KeywordClassifier::from_yaml("classification:\n  - {command: greet, texts: [hi]}\n")
                    .unwrap(),
            ))
            .store(store.clone())
            .build()
            .unwrap();

        bot.answer("amy", "hi").await.unwrap();
        assert!(store.exists("amy").await.unwrap());
        assert_eq!(bot.name(), "greeter");
    }

    #[test]
    fn test_extension_timeout_before_transport() {
        let transport = Arc::new(parley_extension::RpcTransport::new("127.0.0.1", 1));
        let bot = BotBuilder::new()
            .domain(Domain::from_yaml(FSM).unwrap())
            .classifier(classifier())
            .extension_timeout(Duration::from_millis(20))
            .transport(transport)
            .build()
            .unwrap();
        assert_eq!(bot.gateway.as_ref().unwrap().timeout(), Duration::from_millis(20));
    }

    #[test]
    fn test_extension_timeout_overrides_config() {
        let bot = BotBuilder::new()
            .domain(Domain::from_yaml(FSM).unwrap())
            .classifier(classifier())
            .extension_config(ExtensionConfig::Http {
                url: "http://127.0.0.1:1".into(),
                timeout_ms: 10_000,
            })
            .extension_timeout(Duration::from_millis(20))
            .build()
            .unwrap();
        assert_eq!(bot.gateway.as_ref().unwrap().timeout(), Duration::from_millis(20));
    }
}
