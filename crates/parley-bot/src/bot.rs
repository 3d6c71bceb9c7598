use std::path::Path;
use std::sync::Arc;

use parley_core::{Answer, Classifier, Prediction, Result, Session, SessionStore};
use parley_extension::ExtensionGateway;
use parley_fsm::{Domain, DomainView, TurnOutcome, resolve};
use parley_store::SenderLocks;
use tracing::{debug, warn};

use crate::builder::BotBuilder;
use crate::classifier::KeywordClassifier;
use crate::config::BotConfig;

pub const DOMAIN_FILE: &str = "fsm.yml";

/// Everything that happened during one turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub prediction: Prediction,
    pub outcome: TurnOutcome,
    pub answers: Vec<Answer>,
    pub session: Session,
    /// Extension function dispatched for this turn, if any.
    pub function: Option<String>,
    /// Set when the extension call degraded to the error answer.
    pub extension_failed: bool,
}

pub struct Bot {
    pub(crate) name: String,
    pub(crate) domain: Arc<Domain>,
    pub(crate) view: DomainView,
    pub(crate) classifier: Arc<dyn Classifier>,
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) locks: SenderLocks,
    pub(crate) gateway: Option<ExtensionGateway>,
    pub(crate) threshold: f64,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::new()
    }

    /// Assemble a bot from a directory holding `fsm.yml` and optionally `bot.yml`
    /// and `clf.yml`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config = BotConfig::load(dir)?;
        let domain = Domain::from_file(dir.join(DOMAIN_FILE))?;
        let classifier = KeywordClassifier::load(dir)?;

        for command in classifier.commands() {
            if !domain.commands().iter().any(|c| c == command) {
                warn!(command, "Classifier predicts a command the domain does not declare");
            }
        }

        BotBuilder::from_config(config)
            .domain(domain)
            .classifier(Arc::new(classifier))
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn has_extension(&self) -> bool {
        self.gateway.is_some()
    }

    pub async fn answer(&self, sender: &str, text: &str) -> Result<Vec<Answer>> {
        Ok(self.turn(sender, text).await?.answers)
    }

    /// Run one turn for `sender`.
    ///
    /// Turns for the same sender are serialized from the session read through the
    /// extension round trip to the session write. Only store errors are returned.
    pub async fn turn(&self, sender: &str, text: &str) -> Result<Turn> {
        let _guard = self.locks.acquire(sender).await;

        let mut session = self.store.get_or_create(sender).await?;
        if !self.domain.is_concrete_state(session.state) {
            warn!(
                sender,
                state = session.state,
                "Stored state is not in the domain, starting over"
            );
            session = Session::new();
        }
        let prediction = self.predict(text).await;
        let resolution = resolve(&prediction.label, text, &session, &self.domain);

        let mut turn = Turn {
            prediction,
            outcome: resolution.outcome,
            answers: resolution.answers,
            session: resolution.session,
            function: None,
            extension_failed: false,
        };

        if let Some(call) = resolution.extension {
            match &self.gateway {
                Some(gateway) => {
                    let reply = gateway
                        .dispatch(&call, Some(sender), &turn.session, &self.view)
                        .await;
                    turn.answers = reply.answers;
                    turn.session = reply.session;
                    turn.extension_failed = reply.failed;
                }
                None => {
                    warn!(
                        sender,
                        function = %call.function,
                        "No extension configured, answering with the error message"
                    );
                    turn.answers = self.domain.defaults().error_answers();
                    turn.extension_failed = true;
                }
            }
            turn.function = Some(call.function);
        }

        self.store.set(sender, &turn.session).await?;
        debug!(
            sender,
            command = %turn.prediction.label,
            state = turn.session.state,
            "Turn complete"
        );
        Ok(turn)
    }

    async fn predict(&self, text: &str) -> Prediction {
        match self.classifier.predict(text).await {
            // NaN never clears the threshold.
            Ok(prediction) if !(prediction.confidence >= self.threshold) => {
                debug!(
                    label = %prediction.label,
                    confidence = prediction.confidence,
                    threshold = self.threshold,
                    "Prediction below threshold"
                );
                Prediction::abstain()
            }
            Ok(prediction) => prediction,
            Err(e) => {
                warn!(error = %e, "Classifier failed, treating as unsure");
                Prediction::abstain()
            }
        }
    }
}
