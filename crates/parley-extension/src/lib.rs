//! Extension gateway: runs turn logic hosted in another process
//!
//! The engine hands over a function name, the raw text, the sender's session and a
//! [`DomainView`](parley_fsm::DomainView); the extension answers with the session the
//! turn should end in and the answers to send back. Two transports implement the same
//! contract:
//!
//! - [`RpcTransport`]: newline-delimited JSON frames over TCP
//! - [`HttpTransport`]: `POST {url}/command` with a JSON body
//!
//! [`ExtensionGateway`] wraps either one with a timeout and turns every failure into
//! the domain's error answer with the pre-call session. The [`server`] module is the
//! callee side of both transports.

mod config;
mod gateway;
mod http;
mod rpc;
pub mod server;
mod wire;

pub use config::ExtensionConfig;
pub use gateway::{
    DEFAULT_TIMEOUT, ExtensionGateway, ExtensionReply, ExtensionTransport, create_gateway,
};
pub use http::HttpTransport;
pub use rpc::RpcTransport;
pub use server::{ExtensionHandler, ExtensionRegistry, http_router, serve_rpc};
pub use wire::{
    ExtensionRequest, ExtensionResponse, HttpRequest, HttpResponse, RpcRequest, RpcResponse,
};
