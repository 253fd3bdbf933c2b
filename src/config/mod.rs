//! # 配置管理模块
//!
//! 处理应用配置加载、验证和管理

mod app_config;
mod gateway;
mod manager;

pub use app_config::{AppConfig, ServerConfig};
pub use gateway::{DEFAULT_TARGET_PARAM, GatewayConfig, GatewaySettings, RelayProviderConfig};
pub use manager::{CONFIG_PATH_ENV, ConfigManager, ENV_OVERRIDE_PREFIX};

use crate::ensure;
use crate::error::config::ConfigError;

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> crate::error::Result<()> {
    // 验证服务器配置
    ensure!(
        config.server.port != 0,
        ConfigError::invalid("server.port", "must be greater than 0")
    );
    ensure!(
        config.server.max_request_body_bytes > 0,
        ConfigError::invalid("server.max_request_body_bytes", "must be greater than 0")
    );
    config.server.bind_address()?;

    // 验证网关配置
    config.gateway.validate()?;

    Ok(())
}
