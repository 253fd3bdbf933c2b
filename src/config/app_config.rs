//! # 应用配置结构定义

use super::gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 监听配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 转发网关配置
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// 监听服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听主机
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 入站请求体上限（字节）
    #[serde(default = "default_max_request_body_bytes")]
    pub max_request_body_bytes: usize,
    /// 关闭时等待在途请求的秒数，超时后取消剩余转发
    #[serde(default = "default_shutdown_grace_seconds")]
    pub shutdown_grace_seconds: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3001
}

const fn default_max_request_body_bytes() -> usize {
    10 * 1024 * 1024
}

const fn default_shutdown_grace_seconds() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_request_body_bytes: default_max_request_body_bytes(),
            shutdown_grace_seconds: default_shutdown_grace_seconds(),
        }
    }
}

impl ServerConfig {
    /// 获取绑定地址
    pub fn bind_address(&self) -> std::io::Result<SocketAddr> {
        let addr = if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        };
        addr.parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid address '{addr}': {e}"),
            )
        })
    }
}
