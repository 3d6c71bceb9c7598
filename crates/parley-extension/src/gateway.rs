use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::{Answer, ParleyError, Result, Session};
use parley_fsm::{DomainView, ExtensionCall};
use tracing::{debug, warn};

use crate::config::ExtensionConfig;
use crate::http::HttpTransport;
use crate::rpc::RpcTransport;
use crate::wire::{ExtensionRequest, ExtensionResponse};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One synchronous request/response exchange with an extension process.
#[async_trait]
pub trait ExtensionTransport: Send + Sync {
    fn name(&self) -> &str;

    async fn call(&self, request: &ExtensionRequest) -> Result<ExtensionResponse>;
}

/// What a dispatched extension call resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionReply {
    pub answers: Vec<Answer>,
    pub session: Session,
    pub failed: bool,
}

#[derive(Clone)]
pub struct ExtensionGateway {
    transport: Arc<dyn ExtensionTransport>,
    timeout: Duration,
}

impl ExtensionGateway {
    pub fn new(transport: Arc<dyn ExtensionTransport>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Run the call under the timeout and check the returned session is usable.
    pub async fn call(&self, request: &ExtensionRequest) -> Result<ExtensionResponse> {
        let response = tokio::time::timeout(self.timeout, self.transport.call(request))
            .await
            .map_err(|_| {
                ParleyError::Extension(format!("timed out after {:?}", self.timeout))
            })??;

        if !request.domain.is_concrete_state(response.session.state) {
            return Err(ParleyError::Extension(format!(
                "returned unknown state id {}",
                response.session.state
            )));
        }
        Ok(response)
    }

    /// Dispatch an extension call for a turn. Never fails: any error yields the
    /// domain's error answer together with `session` exactly as passed in.
    pub async fn dispatch(
        &self,
        call: &ExtensionCall,
        sender: Option<&str>,
        session: &Session,
        domain: &DomainView,
    ) -> ExtensionReply {
        let request = ExtensionRequest {
            function: call.function.clone(),
            text: call.text.clone(),
            sender: sender.map(str::to_string),
            session: session.clone(),
            domain: domain.clone(),
        };

        match self.call(&request).await {
            Ok(response) => {
                debug!(
                    function = %call.function,
                    transport = self.transport.name(),
                    state = response.session.state,
                    "Extension call succeeded"
                );
                ExtensionReply {
                    answers: response.answers,
                    session: response.session,
                    failed: false,
                }
            }
            Err(e) => {
                warn!(
                    function = %call.function,
                    transport = self.transport.name(),
                    error = %e,
                    "Extension call failed"
                );
                ExtensionReply {
                    answers: domain.defaults.error_answers(),
                    session: session.clone(),
                    failed: true,
                }
            }
        }
    }
}

pub fn create_gateway(config: &ExtensionConfig) -> Result<ExtensionGateway> {
    let transport: Arc<dyn ExtensionTransport> = match config {
        ExtensionConfig::Rpc { host, port, .. } => {
            if host.is_empty() {
                return Err(ParleyError::Config("rpc extension requires a host".into()));
            }
            Arc::new(RpcTransport::new(host, *port))
        }
        ExtensionConfig::Http { url, .. } => {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ParleyError::Config(format!(
                    "http extension url must start with http:// or https://, got '{}'",
                    url
                )));
            }
            Arc::new(HttpTransport::new(url))
        }
    };
    Ok(ExtensionGateway::new(transport).with_timeout(config.timeout()))
}
