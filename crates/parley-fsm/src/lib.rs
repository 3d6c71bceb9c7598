//! Domain compiler and transition resolution engine

mod config;
mod domain;
mod engine;

pub use config::{
    Defaults, EXTENSION_PREFIX, FsmConfig, FunctionSpec, SlotMode, SlotSpec, TransitionSpec,
    WILDCARD,
};
pub use domain::{
    Domain, DomainView, MessagePayload, SlotEntry, SlotRule, TransitionKey, TransitionRecord,
    WILDCARD_STATE_ID,
};
pub use engine::{ExtensionCall, Resolution, TurnOutcome, candidate_keys, resolve};
pub use parley_core::{Answer, Session};
