use std::collections::{HashMap, HashSet};
use std::path::Path;

use parley_core::{Answer, MessageSpec, ParleyError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Defaults, EXTENSION_PREFIX, FsmConfig, FunctionSpec, SlotMode, WILDCARD};

/// Id of the synthetic `any` state. Only ever a lookup key component.
pub const WILDCARD_STATE_ID: i32 = -1;

/// `(command, origin state)` lookup key; either side may be the wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionKey {
    pub command: String,
    pub state: i32,
}

impl TransitionKey {
    pub fn new(command: impl Into<String>, state: i32) -> Self {
        Self {
            command: command.into(),
            state,
        }
    }

    /// Transition declared from any state for a specific command.
    pub fn from_any(command: impl Into<String>) -> Self {
        Self::new(command, WILDCARD_STATE_ID)
    }

    /// Transition declared for any command while in a specific state.
    pub fn any_command(state: i32) -> Self {
        Self::new(WILDCARD, state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePayload {
    Literal(Vec<Answer>),
    FunctionRef(String),
}

impl MessagePayload {
    fn compile(message: MessageSpec) -> Result<Self> {
        if let Some(text) = message.as_text() {
            if text.starts_with(EXTENSION_PREFIX) {
                if text.len() == EXTENSION_PREFIX.len() {
                    return Err(ParleyError::Config(format!(
                        "extension reference '{}' has no function name",
                        text
                    )));
                }
                return Ok(MessagePayload::FunctionRef(text.to_string()));
            }
        }
        Ok(MessagePayload::Literal(message.into_answers()))
    }

    pub fn function_name(&self) -> Option<&str> {
        match self {
            MessagePayload::FunctionRef(name) => Some(name),
            MessagePayload::Literal(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    pub target: i32,
    pub payload: MessagePayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRule {
    pub name: String,
    pub mode: SlotMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry {
    pub command: String,
    pub state: i32,
    pub slot: SlotRule,
}

/// The data half of a [`Domain`], safe to ship to an extension process.
///
/// Transition records are left out on purpose: an extension that wants to move the
/// conversation returns the target state id in its session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomainView {
    #[serde(default)]
    pub state_table: HashMap<String, i32>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub slot_table: Vec<SlotEntry>,
    #[serde(default)]
    pub defaults: Defaults,
}

impl DomainView {
    pub fn state_id(&self, name: &str) -> Option<i32> {
        self.state_table.get(name).copied()
    }

    pub fn is_concrete_state(&self, id: i32) -> bool {
        id != WILDCARD_STATE_ID && self.state_table.values().any(|&v| v == id)
    }
}

/// Compiled, immutable dialogue domain.
#[derive(Debug, Clone)]
pub struct Domain {
    state_table: HashMap<String, i32>,
    state_names: Vec<String>,
    commands: Vec<String>,
    transitions: HashMap<TransitionKey, TransitionRecord>,
    slots: HashMap<TransitionKey, SlotRule>,
    defaults: Defaults,
}

impl Domain {
    pub fn compile(config: FsmConfig) -> Result<Self> {
        if config.states.is_empty() {
            return Err(ParleyError::Config(
                "at least one state must be declared".into(),
            ));
        }

        let mut state_table = HashMap::with_capacity(config.states.len() + 1);
        for (id, name) in config.states.iter().enumerate() {
            if name == WILDCARD {
                return Err(ParleyError::Config(format!(
                    "'{}' is reserved and cannot be declared as a state",
                    WILDCARD
                )));
            }
            if state_table.insert(name.clone(), id as i32).is_some() {
                return Err(ParleyError::Config(format!("duplicate state '{}'", name)));
            }
        }
        state_table.insert(WILDCARD.to_string(), WILDCARD_STATE_ID);

        let mut seen_commands = HashSet::with_capacity(config.commands.len());
        for command in &config.commands {
            if command == WILDCARD {
                return Err(ParleyError::Config(format!(
                    "'{}' is reserved and cannot be declared as a command",
                    WILDCARD
                )));
            }
            if !seen_commands.insert(command.as_str()) {
                return Err(ParleyError::Config(format!(
                    "duplicate command '{}'",
                    command
                )));
            }
        }

        let mut transitions = HashMap::with_capacity(config.functions.len());
        let mut slots = HashMap::new();
        for function in config.functions {
            let key = Self::compile_key(&function, &state_table, &seen_commands)?;
            let target = match state_table.get(&function.transition.into) {
                Some(&id) if id != WILDCARD_STATE_ID => id,
                _ => {
                    return Err(ParleyError::Config(format!(
                        "transition into unknown state '{}'",
                        function.transition.into
                    )));
                }
            };

            match function.slot {
                Some(spec) if !spec.is_empty() => {
                    let rule = Self::compile_slot(spec.name, spec.mode)?;
                    slots.insert(key.clone(), rule);
                }
                _ => {
                    slots.remove(&key);
                }
            }

            let record = TransitionRecord {
                target,
                payload: MessagePayload::compile(function.message)?,
            };
            if transitions.insert(key.clone(), record).is_some() {
                warn!(
                    command = %key.command,
                    state = key.state,
                    "Duplicate transition declaration, the later one wins"
                );
            }
        }

        let mut state_names = vec![String::new(); config.states.len()];
        for (name, &id) in &state_table {
            if id != WILDCARD_STATE_ID {
                state_names[id as usize] = name.clone();
            }
        }

        info!(states = state_names.len(), "Loaded states");
        for (id, name) in state_names.iter().enumerate() {
            info!(id, state = %name, "state");
        }

        Ok(Self {
            state_table,
            state_names,
            commands: config.commands,
            transitions,
            slots,
            defaults: config.defaults,
        })
    }

    fn compile_key(
        function: &FunctionSpec,
        state_table: &HashMap<String, i32>,
        commands: &HashSet<&str>,
    ) -> Result<TransitionKey> {
        let command = &function.command;
        if command != WILDCARD && !commands.contains(command.as_str()) {
            return Err(ParleyError::Config(format!(
                "transition uses undeclared command '{}'",
                command
            )));
        }
        let origin = state_table.get(&function.transition.from).ok_or_else(|| {
            ParleyError::Config(format!(
                "transition from unknown state '{}'",
                function.transition.from
            ))
        })?;
        Ok(TransitionKey::new(command.clone(), *origin))
    }

    fn compile_slot(name: String, mode: Option<SlotMode>) -> Result<SlotRule> {
        if name.is_empty() {
            return Err(ParleyError::Config("slot is missing a name".into()));
        }
        match mode {
            Some(SlotMode::WholeText) => Ok(SlotRule {
                name,
                mode: SlotMode::WholeText,
            }),
            Some(SlotMode::Regex) => Err(ParleyError::Config(format!(
                "slot '{}': extraction mode 'regex' is not supported",
                name
            ))),
            None => Err(ParleyError::Config(format!(
                "slot '{}' has no extraction mode",
                name
            ))),
        }
    }

    pub fn from_yaml(yaml_content: &str) -> Result<Self> {
        Self::compile(FsmConfig::from_yaml(yaml_content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::compile(FsmConfig::from_file(path)?)
    }

    pub fn state_id(&self, name: &str) -> Option<i32> {
        self.state_table.get(name).copied()
    }

    pub fn state_name(&self, id: i32) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.state_names.get(i))
            .map(String::as_str)
    }

    pub fn is_concrete_state(&self, id: i32) -> bool {
        self.state_name(id).is_some()
    }

    pub fn state_table(&self) -> &HashMap<String, i32> {
        &self.state_table
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn transition(&self, key: &TransitionKey) -> Option<&TransitionRecord> {
        self.transitions.get(key)
    }

    pub fn slot(&self, key: &TransitionKey) -> Option<&SlotRule> {
        self.slots.get(key)
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Function names referenced by any transition, sorted and deduplicated.
    pub fn extension_functions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .transitions
            .values()
            .filter_map(|record| record.payload.function_name())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn view(&self) -> DomainView {
        let mut slot_table: Vec<SlotEntry> = self
            .slots
            .iter()
            .map(|(key, rule)| SlotEntry {
                command: key.command.clone(),
                state: key.state,
                slot: rule.clone(),
            })
            .collect();
        slot_table.sort_by(|a, b| (a.state, &a.command).cmp(&(b.state, &b.command)));

        DomainView {
            state_table: self.state_table.clone(),
            commands: self.commands.clone(),
            slot_table,
            defaults: self.defaults.clone(),
        }
    }
}
