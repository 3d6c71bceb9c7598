//! Callee side of the extension protocol
//!
//! Register async handlers by function name, then expose them with [`serve_rpc`] or
//! mount [`http_router`] in an axum server.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use parley_core::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::wire::{
    ExtensionRequest, ExtensionResponse, HttpRequest, HttpResponse, RpcRequest, RpcResponse,
};

const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// An extension function. `Err` is reported back to the caller as a remote error.
#[async_trait]
pub trait ExtensionHandler: Send + Sync {
    async fn handle(
        &self,
        request: ExtensionRequest,
    ) -> std::result::Result<ExtensionResponse, String>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ExtensionHandler for FnHandler<F>
where
    F: Fn(ExtensionRequest) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<ExtensionResponse, String>> + Send,
{
    async fn handle(
        &self,
        request: ExtensionRequest,
    ) -> std::result::Result<ExtensionResponse, String> {
        (self.0)(request).await
    }
}

#[derive(Default)]
pub struct ExtensionRegistry {
    handlers: HashMap<String, Arc<dyn ExtensionHandler>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        function: impl Into<String>,
        handler: impl ExtensionHandler + 'static,
    ) -> &mut Self {
        self.handlers.insert(function.into(), Arc::new(handler));
        self
    }

    pub fn register_fn<F, Fut>(&mut self, function: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(ExtensionRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<ExtensionResponse, String>> + Send + 'static,
    {
        self.register(function, FnHandler(f))
    }

    pub fn functions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn handle(
        &self,
        request: ExtensionRequest,
    ) -> std::result::Result<ExtensionResponse, String> {
        let Some(handler) = self.handlers.get(&request.function) else {
            return Err(format!("unknown extension function '{}'", request.function));
        };
        debug!(function = %request.function, "Handling extension call");
        handler.handle(request).await
    }
}

/// Accept connections forever, answering one JSON line per request line.
///
/// Accept errors are logged and retried; they never stop the server.
pub async fn serve_rpc(listener: TcpListener, registry: Arc<ExtensionRegistry>) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                let delay = accept_retry_delay(&e);
                warn!(error = %e, retry_in = ?delay, "RPC accept failed");
                tokio::time::sleep(delay).await;
                continue;
            }
        };
        let registry = registry.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, registry).await {
                warn!(peer = %peer, error = %e, "RPC connection failed");
            }
        });
    }
}

/// Errors tied to a single connection are retried at once. Anything else,
/// such as running out of file descriptors, backs off first.
fn accept_retry_delay(e: &io::Error) -> Duration {
    match e.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => Duration::ZERO,
        _ => ACCEPT_BACKOFF,
    }
}

async fn handle_connection(stream: TcpStream, registry: Arc<ExtensionRegistry>) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => match registry.handle(request.into()).await {
                Ok(response) => RpcResponse::ok(response),
                Err(e) => RpcResponse::error(e),
            },
            Err(e) => RpcResponse::error(format!("malformed request: {}", e)),
        };
        let mut frame = serde_json::to_vec(&response)?;
        frame.push(b'\n');
        write_half.write_all(&frame).await?;
        write_half.flush().await?;
    }
    Ok(())
}

pub fn http_router(registry: Arc<ExtensionRegistry>) -> Router {
    Router::new()
        .route("/command", post(handle_command))
        .with_state(registry)
}

async fn handle_command(
    State(registry): State<Arc<ExtensionRegistry>>,
    Json(request): Json<HttpRequest>,
) -> (StatusCode, Json<HttpResponse>) {
    match registry.handle(request.into()).await {
        Ok(response) => (StatusCode::OK, Json(HttpResponse::ok(response))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HttpResponse::error(e)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::Session;
    use parley_fsm::DomainView;

    struct Echo;

    #[async_trait]
    impl ExtensionHandler for Echo {
        async fn handle(
            &self,
            request: ExtensionRequest,
        ) -> std::result::Result<ExtensionResponse, String> {
            Ok(ExtensionResponse::reply(request.session, request.text))
        }
    }

    fn request(function: &str) -> ExtensionRequest {
        ExtensionRequest {
            function: function.into(),
            text: "ping".into(),
            sender: None,
            session: Session::new(),
            domain: DomainView::default(),
        }
    }

    #[tokio::test]
    async fn test_registry_dispatch() {
        let mut registry = ExtensionRegistry::new();
        registry.register("ext_echo", Echo);

        let response = registry.handle(request("ext_echo")).await.unwrap();
        assert_eq!(response.answers[0].text, "ping");
        assert_eq!(registry.functions(), vec!["ext_echo"]);
    }

    #[tokio::test]
    async fn test_registry_unknown_function() {
        let registry = ExtensionRegistry::new();
        let err = registry.handle(request("ext_missing")).await.unwrap_err();
        assert!(err.contains("ext_missing"));
    }

    #[tokio::test]
    async fn test_malformed_rpc_frame_gets_error_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_rpc(listener, Arc::new(ExtensionRegistry::new())));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(b"{not json}\n").await.unwrap();

        let mut lines = BufReader::new(read_half).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let response: RpcResponse = serde_json::from_str(&line).unwrap();
        assert!(response.error.unwrap().starts_with("malformed request"));
    }

    #[test]
    fn test_accept_errors_are_retried() {
        let aborted = io::Error::from(io::ErrorKind::ConnectionAborted);
        assert_eq!(accept_retry_delay(&aborted), Duration::ZERO);

        // EMFILE surfaces as an uncategorized OS error.
        let exhausted = io::Error::from_raw_os_error(24);
        assert_eq!(accept_retry_delay(&exhausted), ACCEPT_BACKOFF);
    }

    #[tokio::test]
    async fn test_server_outlives_aborted_clients() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_rpc(listener, Arc::new(ExtensionRegistry::new())));

        for _ in 0..5 {
            drop(TcpStream::connect(addr).await.unwrap());
        }

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(b"{not json}\n").await.unwrap();
        let mut lines = BufReader::new(read_half).lines();
        assert!(lines.next_line().await.unwrap().is_some());
        assert!(!server.is_finished());
    }
}
