//! # CORS Gateway Library
//!
//! 无状态的 CORS 转发网关：直连目标失败时按顺序回退到公共中继

pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{ProxyError, Result};
pub use proxy::ProxyServer;
