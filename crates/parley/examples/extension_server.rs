//! Extension process for `demos/echo`.
//!
//! Run this, then `parley --path demos/echo` in another terminal.
//! Pass `--http` to serve `POST /command` instead of the RPC framing.

use std::sync::Arc;

use parley::extension::ExtensionResponse;
use parley::extension::server::{ExtensionRegistry, http_router, serve_rpc};
use parley::message::Answer;
use tokio::net::TcpListener;

const JOKES: &[&str] = &[
    "I told my computer I needed a break, and it said no problem, it would go to sleep.",
    "There are 10 kinds of people: those who understand binary and those who don't.",
    "A SQL query walks into a bar, walks up to two tables and asks: may I join you?",
];

fn registry() -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::new();
    registry
        .register_fn("ext_greet", |req| async move {
            let greeting = req.session.slot("greeting").unwrap_or("hello").to_string();
            let sender = req.sender.clone().unwrap_or_else(|| "stranger".into());
            Ok::<_, String>(ExtensionResponse::reply(
                req.session,
                format!("{} to you too, {}!", greeting, sender),
            ))
        })
        .register_fn("ext_joke", |req| async move {
            let count: usize = req
                .session
                .slot("jokes")
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            let joke = JOKES[count % JOKES.len()];
            let session = req.session.with_slot("jokes", (count + 1).to_string());
            Ok::<_, String>(ExtensionResponse::new(
                session,
                vec![
                    Answer::text(joke),
                    Answer::text("").with_image("https://http.cat/200"),
                ],
            ))
        });
    registry
}

#[tokio::main]
async fn main() -> parley::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "parley=debug".to_string()))
        .init();

    let registry = Arc::new(registry());
    let listener = TcpListener::bind("127.0.0.1:8770").await?;

    if std::env::args().any(|arg| arg == "--http") {
        println!("Serving POST http://127.0.0.1:8770/command");
        axum::serve(listener, http_router(registry)).await?;
        Ok(())
    } else {
        println!("Serving RPC on 127.0.0.1:8770");
        serve_rpc(listener, registry).await
    }
}
