//! # 测试辅助函数
//!
//! 提供通用的测试工具和辅助函数

use crate::config::{AppConfig, GatewayConfig, RelayProviderConfig};
use crate::types::{DeploymentMode, TimeoutMillis};
use std::io::Write;
use std::sync::Once;
use tempfile::NamedTempFile;
use tracing::Level;

static INIT: Once = Once::new();

/// 初始化测试环境
pub fn init_test_env() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 一个确定没有服务监听的本地地址，连接会立即被拒绝
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").ok();
    let port = listener
        .as_ref()
        .and_then(|l| l.local_addr().ok())
        .map_or(9, |addr| addr.port());
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

/// 构建测试用配置
#[must_use]
pub fn test_config(
    mode: DeploymentMode,
    timeout_ms: u64,
    relays: Vec<RelayProviderConfig>,
) -> AppConfig {
    AppConfig {
        gateway: GatewayConfig {
            deployment_mode: mode,
            timeout_ms: TimeoutMillis::new(timeout_ms),
            relays,
            ..GatewayConfig::default()
        },
        ..AppConfig::default()
    }
}

/// 把 TOML 内容写入临时文件
pub fn write_temp_config(content: &str) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}
