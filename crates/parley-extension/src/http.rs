use async_trait::async_trait;
use parley_core::{ParleyError, Result};

use crate::gateway::ExtensionTransport;
use crate::wire::{ExtensionRequest, ExtensionResponse, HttpRequest, HttpResponse};

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/command", url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ExtensionTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn call(&self, request: &ExtensionRequest) -> Result<ExtensionResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&HttpRequest::from(request))
            .send()
            .await
            .map_err(|e| ParleyError::Extension(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<HttpResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(body);
            return Err(ParleyError::Extension(format!(
                "HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let body: HttpResponse = response
            .json()
            .await
            .map_err(|e| ParleyError::Extension(format!("invalid response: {}", e)))?;
        body.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ExtensionGateway;
    use crate::server::{ExtensionRegistry, http_router};
    use parley_core::{Answer, Session};
    use parley_fsm::{Domain, ExtensionCall};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    fn domain() -> Domain {
        Domain::from_yaml(
            r#"
states: [idle, ask_location]
commands: [weather, joke]
functions:
  - transition: {from: any, into: idle}
    command: joke
    message: "ext_joke"
  - transition: {from: ask_location, into: idle}
    command: any
    message: "ext_weather"
defaults:
  error: "Error"
"#,
        )
        .unwrap()
    }

    async fn spawn_server() -> String {
        let mut registry = ExtensionRegistry::new();
        registry
            .register_fn("ext_joke", |req| async move {
                Ok::<_, String>(ExtensionResponse::reply(req.session, "Hello Universe"))
            })
            .register_fn("ext_weather", |req| async move {
                if req.text == "atlantis" {
                    let ask = req.domain.state_id("ask_location").unwrap_or_default();
                    return Ok::<_, String>(ExtensionResponse::reply(
                        req.session.with_state(ask),
                        "Sorry, I couldn't find your location.",
                    ));
                }
                Err::<ExtensionResponse, _>("weather service unavailable".to_string())
            });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = http_router(Arc::new(registry));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn request(function: &str, text: &str) -> ExtensionRequest {
        ExtensionRequest {
            function: function.into(),
            text: text.into(),
            sender: Some("123".into()),
            session: Session::new(),
            domain: domain().view(),
        }
    }

    #[test]
    fn test_endpoint_normalization() {
        assert_eq!(
            HttpTransport::new("http://localhost:8770/").endpoint(),
            "http://localhost:8770/command"
        );
    }

    #[tokio::test]
    async fn test_http_round_trip() {
        let url = spawn_server().await;
        let transport = HttpTransport::new(&url);

        let response = transport.call(&request("ext_joke", "hello")).await.unwrap();
        assert_eq!(response.answers, vec![Answer::text("Hello Universe")]);
        assert_eq!(response.session, Session::new());
    }

    #[tokio::test]
    async fn test_http_extension_forces_state() {
        let url = spawn_server().await;
        let transport = HttpTransport::new(&url);

        let response = transport
            .call(&request("ext_weather", "atlantis"))
            .await
            .unwrap();
        assert_eq!(response.session.state, 1);
    }

    #[tokio::test]
    async fn test_http_remote_error() {
        let url = spawn_server().await;
        let transport = HttpTransport::new(&url);

        let err = transport
            .call(&request("ext_weather", "Paris"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ParleyError::Extension(msg) if msg.contains("weather service unavailable"))
        );
    }

    #[tokio::test]
    async fn test_http_unreachable_degrades_through_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(&format!("http://{}", addr));
        let gateway = ExtensionGateway::new(Arc::new(transport));
        let session = Session::new().with_slot("city", "Paris");
        let call = ExtensionCall {
            function: "ext_joke".into(),
            text: "joke please".into(),
        };

        let reply = gateway
            .dispatch(&call, Some("123"), &session, &domain().view())
            .await;
        assert!(reply.failed);
        assert_eq!(reply.session, session);
        assert_eq!(reply.answers, vec![Answer::text("Error")]);
    }

    #[tokio::test]
    async fn test_http_garbled_response_degrades_through_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = axum::Router::new().route("/command", axum::routing::post(|| async { "not json" }));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let gateway = ExtensionGateway::new(Arc::new(HttpTransport::new(&format!("http://{}", addr))));
        let session = Session::new().with_state(1).with_slot("city", "Paris");
        let call = ExtensionCall {
            function: "ext_weather".into(),
            text: "Paris".into(),
        };

        let reply = gateway
            .dispatch(&call, Some("123"), &session, &domain().view())
            .await;
        assert!(reply.failed);
        assert_eq!(reply.session, session);
        assert_eq!(reply.answers, vec![Answer::text("Error")]);
    }
}
