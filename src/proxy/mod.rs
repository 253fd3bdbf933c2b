//! # 转发网关模块
//!
//! 入站规范化 -> 直连/中继回退链 -> 响应解包 -> 带 CORS 头的响应

pub mod forwarding;
pub mod handler;
pub mod middleware;
pub mod provider;
pub mod request_normalizer;
pub mod response;
pub mod response_unwrapper;
pub mod server;
pub mod state;
pub mod types;
pub mod upstream;

pub use forwarding::RequestForwarder;
pub use provider::{RelayChain, RelayProvider};
pub use server::{ProxyServer, create_router, shutdown_signal};
pub use state::GatewayState;
pub use types::{AttemptSource, ForwardRequest, ForwardResult, Payload};
pub use upstream::{HttpTransport, ReqwestTransport};
