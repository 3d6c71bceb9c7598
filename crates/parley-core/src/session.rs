//! Per-sender conversation state

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The FSM instance kept for one sender: current state id plus extracted slots.
///
/// `state` always holds a concrete state id, never the `-1` wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: i32,
    #[serde(default)]
    pub slots: HashMap<String, String>,
}

impl Session {
    /// Fresh session for a first-contact sender: the first declared state, no slots.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: i32) -> Self {
        self.state = state;
        self
    }

    pub fn with_slot(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.slots.insert(name.into(), value.into());
        self
    }

    pub fn slot(&self, name: &str) -> Option<&str> {
        self.slots.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = Session::new();
        assert_eq!(session.state, 0);
        assert!(session.slots.is_empty());
    }

    #[test]
    fn test_missing_slots_deserialize_empty() {
        let session: Session = serde_json::from_str(r#"{"state": 2}"#).unwrap();
        assert_eq!(session.state, 2);
        assert!(session.slots.is_empty());
    }

    #[test]
    fn test_slot_lookup() {
        let session = Session::new().with_slot("city", "Lisbon");
        assert_eq!(session.slot("city"), Some("Lisbon"));
        assert_eq!(session.slot("country"), None);
    }
}
