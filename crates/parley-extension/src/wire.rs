//! Messages exchanged with extension processes

use parley_core::{Answer, MessageSpec, ParleyError, Result, Session};
use parley_fsm::DomainView;
use serde::{Deserialize, Serialize};

/// Transport-independent request for one extension call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRequest {
    pub function: String,
    pub text: String,
    pub sender: Option<String>,
    pub session: Session,
    pub domain: DomainView,
}

/// Transport-independent result of one extension call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionResponse {
    pub session: Session,
    pub answers: Vec<Answer>,
}

impl ExtensionResponse {
    pub fn new(session: Session, answers: Vec<Answer>) -> Self {
        Self { session, answers }
    }

    /// Single text answer, keeping the given session.
    pub fn reply(session: Session, text: impl Into<String>) -> Self {
        Self::new(session, vec![Answer::text(text)])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub fsm: Session,
    pub function: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default)]
    pub domain: DomainView,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsm: Option<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<MessageSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    pub function: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsm: Option<Session>,
    #[serde(default)]
    pub domain: DomainView,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpResponse {
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsm: Option<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ExtensionRequest> for RpcRequest {
    fn from(request: &ExtensionRequest) -> Self {
        Self {
            fsm: request.session.clone(),
            function: request.function.clone(),
            text: request.text.clone(),
            sender: request.sender.clone(),
            domain: request.domain.clone(),
        }
    }
}

impl From<RpcRequest> for ExtensionRequest {
    fn from(request: RpcRequest) -> Self {
        Self {
            function: request.function,
            text: request.text,
            sender: request.sender,
            session: request.fsm,
            domain: request.domain,
        }
    }
}

impl From<&ExtensionRequest> for HttpRequest {
    fn from(request: &ExtensionRequest) -> Self {
        Self {
            function: request.function.clone(),
            text: request.text.clone(),
            sender: request.sender.clone(),
            fsm: Some(request.session.clone()),
            domain: request.domain.clone(),
        }
    }
}

impl From<HttpRequest> for ExtensionRequest {
    fn from(request: HttpRequest) -> Self {
        Self {
            function: request.function,
            text: request.text,
            sender: request.sender,
            session: request.fsm.unwrap_or_default(),
            domain: request.domain,
        }
    }
}

impl RpcResponse {
    pub fn ok(response: ExtensionResponse) -> Self {
        Self {
            fsm: Some(response.session),
            response: Some(response.answers.into()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn into_result(self) -> Result<ExtensionResponse> {
        if let Some(error) = self.error {
            return Err(ParleyError::Extension(format!("remote error: {}", error)));
        }
        let session = self
            .fsm
            .ok_or_else(|| ParleyError::Extension("response is missing 'fsm'".into()))?;
        let answers = self
            .response
            .map(MessageSpec::into_answers)
            .unwrap_or_default();
        non_empty(ExtensionResponse::new(session, answers))
    }
}

impl HttpResponse {
    pub fn ok(response: ExtensionResponse) -> Self {
        Self {
            answers: response.answers,
            fsm: Some(response.session),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn into_result(self) -> Result<ExtensionResponse> {
        if let Some(error) = self.error {
            return Err(ParleyError::Extension(format!("remote error: {}", error)));
        }
        let session = self
            .fsm
            .ok_or_else(|| ParleyError::Extension("response is missing 'fsm'".into()))?;
        non_empty(ExtensionResponse::new(session, self.answers))
    }
}

fn non_empty(response: ExtensionResponse) -> Result<ExtensionResponse> {
    if response.answers.is_empty() {
        return Err(ParleyError::Extension("response carries no answers".into()));
    }
    Ok(response)
}
