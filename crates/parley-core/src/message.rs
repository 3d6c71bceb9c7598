//! Response payloads handed back to channels

use serde::{Deserialize, Serialize};

/// A single rendered response: text plus an optional image URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Answer {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// One configured answer, either bare text or a full `{text, image}` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerSpec {
    Text(String),
    Full(Answer),
}

impl From<AnswerSpec> for Answer {
    fn from(spec: AnswerSpec) -> Self {
        match spec {
            AnswerSpec::Text(text) => Answer::text(text),
            AnswerSpec::Full(answer) => answer,
        }
    }
}

/// A message as written in configuration or returned by an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageSpec {
    One(AnswerSpec),
    Many(Vec<AnswerSpec>),
}

impl MessageSpec {
    /// The bare string when the message is a single text answer.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageSpec::One(AnswerSpec::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn into_answers(self) -> Vec<Answer> {
        match self {
            MessageSpec::One(spec) => vec![spec.into()],
            MessageSpec::Many(specs) => specs.into_iter().map(Answer::from).collect(),
        }
    }
}

impl From<&str> for MessageSpec {
    fn from(text: &str) -> Self {
        MessageSpec::One(AnswerSpec::Text(text.to_string()))
    }
}

impl From<Vec<Answer>> for MessageSpec {
    fn from(answers: Vec<Answer>) -> Self {
        MessageSpec::Many(answers.into_iter().map(AnswerSpec::Full).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_text_message() {
        let spec: MessageSpec = serde_json::from_str(r#""Turning on.""#).unwrap();
        assert_eq!(spec.as_text(), Some("Turning on."));
        assert_eq!(spec.into_answers(), vec![Answer::text("Turning on.")]);
    }

    #[test]
    fn test_list_message_keeps_order() {
        let spec: MessageSpec = serde_json::from_str(r#"["Turning off.", "❌"]"#).unwrap();
        assert!(spec.as_text().is_none());
        assert_eq!(
            spec.into_answers(),
            vec![Answer::text("Turning off."), Answer::text("❌")]
        );
    }

    #[test]
    fn test_mixed_message_with_image() {
        let spec: MessageSpec = serde_json::from_str(
            r#"["Here it is", {"text": "A cat", "image": "https://example.com/cat.png"}]"#,
        )
        .unwrap();
        let answers = spec.into_answers();
        assert_eq!(answers.len(), 2);
        assert_eq!(
            answers[1],
            Answer::text("A cat").with_image("https://example.com/cat.png")
        );
    }

    #[test]
    fn test_answer_serialization_skips_missing_image() {
        let json = serde_json::to_string(&Answer::text("hi")).unwrap();
        assert_eq!(json, r#"{"text":"hi"}"#);
    }
}
