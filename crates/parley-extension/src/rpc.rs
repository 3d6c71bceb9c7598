use async_trait::async_trait;
use parley_core::{ParleyError, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::gateway::ExtensionTransport;
use crate::wire::{ExtensionRequest, ExtensionResponse, RpcRequest, RpcResponse};

/// Largest response frame accepted by default, newline included.
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

/// Line-delimited JSON over TCP: one request frame, one response frame, per connection.
pub struct RpcTransport {
    addr: String,
    max_response: u64,
}

impl RpcTransport {
    pub fn new(host: impl AsRef<str>, port: u16) -> Self {
        Self {
            addr: format!("{}:{}", host.as_ref(), port),
            max_response: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_max_response(mut self, bytes: u64) -> Self {
        self.max_response = bytes.max(1);
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

fn map_io_err(addr: &str, e: std::io::Error) -> ParleyError {
    ParleyError::Extension(format!("rpc {}: {}", addr, e))
}

#[async_trait]
impl ExtensionTransport for RpcTransport {
    fn name(&self) -> &str {
        "rpc"
    }

    async fn call(&self, request: &ExtensionRequest) -> Result<ExtensionResponse> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| map_io_err(&self.addr, e))?;
        let (read_half, mut write_half) = stream.into_split();

        let mut frame = serde_json::to_vec(&RpcRequest::from(request))?;
        frame.push(b'\n');
        write_half
            .write_all(&frame)
            .await
            .map_err(|e| map_io_err(&self.addr, e))?;
        write_half
            .flush()
            .await
            .map_err(|e| map_io_err(&self.addr, e))?;

        let mut reader = BufReader::new(read_half.take(self.max_response));
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| map_io_err(&self.addr, e))?;
        if read == 0 {
            return Err(ParleyError::Extension(format!(
                "rpc {}: connection closed before a response",
                self.addr
            )));
        }
        if !line.ends_with('\n') && read as u64 >= self.max_response {
            return Err(ParleyError::Extension(format!(
                "rpc {}: response exceeds {} bytes",
                self.addr, self.max_response
            )));
        }

        let response: RpcResponse = serde_json::from_str(line.trim_end()).map_err(|e| {
            ParleyError::Extension(format!("rpc {}: invalid response: {}", self.addr, e))
        })?;
        response.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ExtensionGateway;
    use crate::server::{ExtensionRegistry, serve_rpc};
    use parley_core::{Answer, Session};
    use parley_fsm::{Domain, ExtensionCall};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    fn domain() -> Domain {
        Domain::from_yaml(
            r#"
states: [search, found, ask_again]
commands: [search]
functions:
  - transition: {from: search, into: found}
    command: search
    slot: {name: pokemon, mode: whole_text}
    message: "ext_search_pokemon"
defaults:
  error: "Error"
"#,
        )
        .unwrap()
    }

    fn registry() -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        registry.register_fn("ext_search_pokemon", |req| async move {
            let name = req.session.slot("pokemon").unwrap_or_default().to_string();
            if name == "missingno" {
                let retry = req.domain.state_id("ask_again").unwrap_or_default();
                return Ok::<_, String>(ExtensionResponse::reply(
                    req.session.clone().with_state(retry),
                    "Never heard of it, try another one.",
                ));
            }
            Ok::<_, String>(ExtensionResponse::new(
                req.session,
                vec![Answer::text(format!("Name: {}", name)), Answer::text("ID: 25")],
            ))
        });
        registry
    }

    async fn spawn_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(serve_rpc(listener, Arc::new(registry())));
        port
    }

    /// A server that answers every request line with `reply`, verbatim.
    async fn spawn_raw_server(reply: Vec<u8>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let (read_half, mut write_half) = stream.into_split();
                let mut line = String::new();
                BufReader::new(read_half).read_line(&mut line).await.unwrap();
                write_half.write_all(&reply).await.unwrap();
            }
        });
        port
    }

    fn search_call() -> ExtensionCall {
        ExtensionCall {
            function: "ext_search_pokemon".into(),
            text: "pikachu".into(),
        }
    }

    fn request(function: &str, session: Session) -> ExtensionRequest {
        ExtensionRequest {
            function: function.into(),
            text: "pikachu".into(),
            sender: Some("ash".into()),
            session,
            domain: domain().view(),
        }
    }

    #[tokio::test]
    async fn test_rpc_round_trip() {
        let port = spawn_server().await;
        let transport = RpcTransport::new("127.0.0.1", port);
        let session = Session::new().with_state(1).with_slot("pokemon", "pikachu");

        let response = transport
            .call(&request("ext_search_pokemon", session.clone()))
            .await
            .unwrap();
        assert_eq!(response.session, session);
        assert_eq!(
            response.answers,
            vec![Answer::text("Name: pikachu"), Answer::text("ID: 25")]
        );
    }

    #[tokio::test]
    async fn test_rpc_extension_forces_state() {
        let port = spawn_server().await;
        let transport = RpcTransport::new("127.0.0.1", port);
        let session = Session::new().with_state(1).with_slot("pokemon", "missingno");

        let response = transport
            .call(&request("ext_search_pokemon", session))
            .await
            .unwrap();
        assert_eq!(response.session.state, 2);
        assert_eq!(response.session.slot("pokemon"), Some("missingno"));
    }

    #[tokio::test]
    async fn test_rpc_several_calls_on_one_server() {
        let port = spawn_server().await;
        let transport = RpcTransport::new("127.0.0.1", port);
        for _ in 0..3 {
            let session = Session::new().with_slot("pokemon", "eevee");
            let response = transport
                .call(&request("ext_search_pokemon", session))
                .await
                .unwrap();
            assert_eq!(response.answers[0], Answer::text("Name: eevee"));
        }
    }

    #[tokio::test]
    async fn test_rpc_unknown_function_is_remote_error() {
        let port = spawn_server().await;
        let transport = RpcTransport::new("127.0.0.1", port);

        let err = transport
            .call(&request("ext_nope", Session::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Extension(msg) if msg.contains("ext_nope")));
    }

    #[tokio::test]
    async fn test_rpc_unreachable_degrades_through_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let gateway = ExtensionGateway::new(Arc::new(RpcTransport::new("127.0.0.1", port)));
        let session = Session::new().with_state(1).with_slot("pokemon", "pikachu");
        let call = ExtensionCall {
            function: "ext_search_pokemon".into(),
            text: "pikachu".into(),
        };

        let reply = gateway
            .dispatch(&call, Some("ash"), &session, &domain().view())
            .await;
        assert!(reply.failed);
        assert_eq!(reply.session, session);
        assert_eq!(reply.answers, vec![Answer::text("Error")]);
    }

    #[tokio::test]
    async fn test_rpc_garbled_response_degrades_through_gateway() {
        let port = spawn_raw_server(b"not json\n".to_vec()).await;
        let gateway = ExtensionGateway::new(Arc::new(RpcTransport::new("127.0.0.1", port)));
        let session = Session::new().with_state(1).with_slot("pokemon", "pikachu");

        let reply = gateway
            .dispatch(&search_call(), Some("ash"), &session, &domain().view())
            .await;
        assert!(reply.failed);
        assert_eq!(reply.session, session);
        assert_eq!(reply.answers, vec![Answer::text("Error")]);
    }

    #[tokio::test]
    async fn test_rpc_oversized_response_is_rejected() {
        let mut reply = vec![b'x'; 4096];
        reply.push(b'\n');
        let port = spawn_raw_server(reply).await;
        let transport = RpcTransport::new("127.0.0.1", port).with_max_response(1024);

        let err = transport
            .call(&request("ext_search_pokemon", Session::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Extension(msg) if msg.contains("exceeds 1024 bytes")));
    }
}
