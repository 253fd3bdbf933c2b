//! # 配置管理器
//!
//! 统一的配置加载入口：TOML 文件 + `CORS_GATEWAY_` 前缀的环境变量覆盖。
//! 配置在启动时加载一次，运行期间只读。

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::AppConfig;
use crate::bail;
use crate::error::config::ConfigError;
use crate::error::{Context, ProxyError, Result};

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "CORS_GATEWAY_CONFIG_PATH";
/// 环境变量覆盖前缀
pub const ENV_OVERRIDE_PREFIX: &str = "CORS_GATEWAY_";

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 当前配置
    config: Arc<AppConfig>,
    /// 配置来源文件
    source: PathBuf,
    /// 已应用的环境变量覆盖数量
    override_count: usize,
}

impl ConfigManager {
    /// 创建配置管理器
    ///
    /// 路径优先级：显式参数 > `CORS_GATEWAY_CONFIG_PATH` > `config/config.{RUST_ENV}.toml`
    pub fn new(explicit_path: Option<&Path>) -> Result<Self> {
        let config_file = explicit_path.map_or_else(Self::default_config_path, Path::to_path_buf);
        Self::from_file(config_file)
    }

    /// 默认配置文件路径
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(path);
        }
        let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        PathBuf::from(format!("config/config.{env}.toml"))
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();

        // 加载初始配置
        let mut config = Self::load_config_file(config_path)?;

        // 应用环境变量覆盖
        let env_overrides = Self::collect_env_overrides(env::vars());
        Self::apply_env_overrides(&mut config, &env_overrides)?;

        // 覆盖后再校验一次
        super::validate_config(&config)?;

        info!(
            path = %config_path.display(),
            overrides = env_overrides.len(),
            relays = config.gateway.relays.len(),
            "配置加载完成"
        );

        Ok(Self {
            config: Arc::new(config),
            source: config_path.to_path_buf(),
            override_count: env_overrides.len(),
        })
    }

    /// 获取当前配置
    #[must_use]
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// 配置来源文件
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// 已应用的环境变量覆盖数量
    #[must_use]
    pub const fn override_count(&self) -> usize {
        self.override_count
    }

    /// 加载配置文件
    fn load_config_file(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            bail!(ConfigError::Load(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let config_content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let config: AppConfig = toml::from_str(&config_content)
            .map_err(ConfigError::from)
            .with_context(|| format!("failed to load {}", path.display()))?;

        Ok(config)
    }

    /// 构建环境变量覆盖映射
    ///
    /// `CORS_GATEWAY_SERVER_PORT` -> `server.port`
    pub fn collect_env_overrides(
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> HashMap<String, String> {
        let mut overrides = HashMap::new();

        for (key, value) in vars {
            if key == CONFIG_PATH_ENV {
                continue;
            }
            if let Some(config_key) = key.strip_prefix(ENV_OVERRIDE_PREFIX) {
                let config_path = config_key.to_lowercase().replace('_', ".");
                overrides.insert(config_path, value);
            }
        }

        debug!("发现 {} 个环境变量覆盖", overrides.len());
        overrides
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(
        config: &mut AppConfig,
        overrides: &HashMap<String, String>,
    ) -> Result<()> {
        for (path, value) in overrides {
            debug!(
                "应用环境变量覆盖: {} = {}",
                path,
                if path.contains("agent") { "***" } else { value }
            );

            Self::apply_override_to_config(config, path, value)?;
        }
        Ok(())
    }

    /// 将环境变量覆盖应用到配置对象
    fn apply_override_to_config(config: &mut AppConfig, path: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => config.server.host = value.to_string(),
            ["server", "port"] => config.server.port = parse_override(path, value)?,
            ["server", "max", "request", "body", "bytes"] => {
                config.server.max_request_body_bytes = parse_override(path, value)?;
            }
            ["server", "shutdown", "grace", "seconds"] => {
                config.server.shutdown_grace_seconds = parse_override(path, value)?;
            }
            ["gateway", "deployment", "mode"] => {
                config.gateway.deployment_mode = value.parse().map_err(ProxyError::config)?;
            }
            ["gateway", "extraction", "mode"] => {
                config.gateway.extraction_mode =
                    Some(value.parse().map_err(ProxyError::config)?);
            }
            ["gateway", "route", "path"] => config.gateway.route_path = Some(value.to_string()),
            ["gateway", "target", "param"] => config.gateway.target_param = value.to_string(),
            ["gateway", "timeout", "ms"] => {
                config.gateway.timeout_ms =
                    crate::types::TimeoutMillis::new(parse_override(path, value)?);
            }
            ["gateway", "total", "deadline", "ms"] => {
                config.gateway.total_deadline_ms =
                    Some(crate::types::TimeoutMillis::new(parse_override(path, value)?));
            }
            ["gateway", "user", "agent"] => config.gateway.user_agent = Some(value.to_string()),
            _ => {
                warn!("未知的配置路径，忽略环境变量覆盖: {}", path);
            }
        }

        Ok(())
    }
}

fn parse_override<T>(path: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        ProxyError::config_with_source(format!("invalid value '{value}' for {path}"), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SERVERLESS_TOML, write_temp_config};
    use crate::types::{DeploymentMode, TargetExtractionMode, TimeoutMillis};
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_collect_env_overrides_maps_keys() {
        let overrides = ConfigManager::collect_env_overrides(vars(&[
            ("CORS_GATEWAY_SERVER_PORT", "8088"),
            ("CORS_GATEWAY_GATEWAY_TIMEOUT_MS", "1500"),
            ("CORS_GATEWAY_CONFIG_PATH", "/etc/gateway.toml"),
            ("HOME", "/root"),
        ]));

        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.get("server.port").map(String::as_str), Some("8088"));
        assert_eq!(
            overrides.get("gateway.timeout.ms").map(String::as_str),
            Some("1500")
        );
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = AppConfig::default();
        let overrides = ConfigManager::collect_env_overrides(vars(&[
            ("CORS_GATEWAY_SERVER_PORT", "8088"),
            ("CORS_GATEWAY_GATEWAY_DEPLOYMENT_MODE", "serverless"),
            ("CORS_GATEWAY_GATEWAY_EXTRACTION_MODE", "path_suffix"),
            ("CORS_GATEWAY_GATEWAY_TOTAL_DEADLINE_MS", "45000"),
            ("CORS_GATEWAY_GATEWAY_UNKNOWN_KEY", "ignored"),
        ]));

        ConfigManager::apply_env_overrides(&mut config, &overrides).unwrap();

        assert_eq!(config.server.port, 8088);
        assert_eq!(config.gateway.deployment_mode, DeploymentMode::Serverless);
        assert_eq!(
            config.gateway.extraction_mode,
            Some(TargetExtractionMode::PathSuffix)
        );
        assert_eq!(
            config.gateway.total_deadline_ms,
            Some(TimeoutMillis::new(45_000))
        );
    }

    #[test]
    fn test_invalid_override_value_is_config_error() {
        let mut config = AppConfig::default();
        let overrides =
            ConfigManager::collect_env_overrides(vars(&[("CORS_GATEWAY_SERVER_PORT", "eighty")]));

        let err = ConfigManager::apply_env_overrides(&mut config, &overrides).unwrap_err();
        assert!(matches!(err, ProxyError::Config { .. }));
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_from_file_missing() {
        let err = ConfigManager::from_file("/nonexistent/gateway.toml").unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_from_file_loads_relays() {
        let file = write_temp_config(SERVERLESS_TOML).unwrap();

        let manager = ConfigManager::from_file(file.path()).unwrap();
        let config = manager.config();
        assert_eq!(config.gateway.relays.len(), 1);
        assert_eq!(config.gateway.deployment_mode, DeploymentMode::Serverless);
        assert_eq!(manager.source(), file.path());
    }

    #[test]
    fn test_from_file_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        let err = ConfigManager::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Configuration parse failed"));
        assert_eq!(err.name(), "ConfigError");
    }
}
