use parley_core::{Answer, Session};
use tracing::debug;

use crate::config::SlotMode;
use crate::domain::{Domain, MessagePayload, SlotRule, TransitionKey};

/// Request to run an extension function for the current turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionCall {
    pub function: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The classifier abstained; the transition table was not consulted.
    LowConfidence,
    /// No candidate key matched.
    NoMatchingTransition,
    Transitioned { key: TransitionKey },
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub outcome: TurnOutcome,
    /// Empty when `extension` is set: the gateway supplies the final answers.
    pub answers: Vec<Answer>,
    pub session: Session,
    pub extension: Option<ExtensionCall>,
}

impl Resolution {
    fn unchanged(outcome: TurnOutcome, answers: Vec<Answer>, session: &Session) -> Self {
        Self {
            outcome,
            answers,
            session: session.clone(),
            extension: None,
        }
    }
}

/// Lookup keys in priority order: from-any with this command, any-command in this
/// state, then the exact match.
pub fn candidate_keys(command: &str, state: i32) -> [TransitionKey; 3] {
    [
        TransitionKey::from_any(command),
        TransitionKey::any_command(state),
        TransitionKey::new(command, state),
    ]
}

/// Resolve one turn against the domain. Never fails and never mutates `session`.
pub fn resolve(command: &str, text: &str, session: &Session, domain: &Domain) -> Resolution {
    if command.is_empty() {
        return Resolution::unchanged(
            TurnOutcome::LowConfidence,
            domain.defaults().unsure_answers(),
            session,
        );
    }

    let matched = candidate_keys(command, session.state)
        .into_iter()
        .find_map(|key| domain.transition(&key).map(|record| (key, record)));

    let Some((key, record)) = matched else {
        debug!(command, state = session.state, "No matching transition");
        return Resolution::unchanged(
            TurnOutcome::NoMatchingTransition,
            domain.defaults().unknown_answers(),
            session,
        );
    };

    debug!(
        command = %key.command,
        from = key.state,
        into = record.target,
        "Transition matched"
    );

    let mut next = session.clone();
    next.state = record.target;
    if let Some(rule) = domain.slot(&key) {
        extract_slot(rule, text, &mut next);
    }

    let (answers, extension) = match &record.payload {
        MessagePayload::Literal(answers) => (answers.clone(), None),
        MessagePayload::FunctionRef(function) => (
            Vec::new(),
            Some(ExtensionCall {
                function: function.clone(),
                text: text.to_string(),
            }),
        ),
    };

    Resolution {
        outcome: TurnOutcome::Transitioned { key },
        answers,
        session: next,
        extension,
    }
}

fn extract_slot(rule: &SlotRule, text: &str, session: &mut Session) {
    match rule.mode {
        SlotMode::WholeText => {
            session.slots.insert(rule.name.clone(), text.to_string());
        }
        // rejected when the domain is compiled
        SlotMode::Regex => {}
    }
}
