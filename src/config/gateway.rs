//! # 转发网关配置
//!
//! 文件中的原始配置（`GatewayConfig`）在启动时解析为不可变的 `GatewaySettings`，
//! 部署模式只决定默认值，显式字段始终优先。

use crate::ensure;
use crate::error::ConfigResult;
use crate::error::config::ConfigError;
use crate::types::{
    DeploymentMode, ResponseEnvelope, TargetExtractionMode, TimeoutMillis, UrlEncodingStyle,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 默认目标参数名
pub const DEFAULT_TARGET_PARAM: &str = "targetUrl";

/// 网关配置（TOML `[gateway]` 段）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// 部署模式
    #[serde(default)]
    pub deployment_mode: DeploymentMode,
    /// 目标提取方式（缺省时由部署模式决定）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_mode: Option<TargetExtractionMode>,
    /// 代理路由前缀（缺省时由部署模式决定）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_path: Option<String>,
    /// 查询参数名
    #[serde(default = "default_target_param")]
    pub target_param: String,
    /// 单次尝试超时（毫秒）
    #[serde(default)]
    pub timeout_ms: TimeoutMillis,
    /// 整条链路的总时限（毫秒），缺省时只有单次超时
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_deadline_ms: Option<TimeoutMillis>,
    /// 出站 User-Agent（缺省时由部署模式决定）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// 400 响应中的用法示例
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_example: Option<String>,
    /// 直连失败后依次尝试的中继
    #[serde(default)]
    pub relays: Vec<RelayProviderConfig>,
}

fn default_target_param() -> String {
    DEFAULT_TARGET_PARAM.to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            deployment_mode: DeploymentMode::default(),
            extraction_mode: None,
            route_path: None,
            target_param: default_target_param(),
            timeout_ms: TimeoutMillis::default(),
            total_deadline_ms: None,
            user_agent: None,
            usage_example: None,
            relays: Vec::new(),
        }
    }
}

/// 中继配置（TOML `[[gateway.relays]]`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayProviderConfig {
    /// 日志与响应头中使用的名称
    pub name: String,
    /// 中继基础地址，目标地址拼接在其后
    pub base_url: String,
    /// 目标地址编码方式
    pub url_encoding: UrlEncodingStyle,
    /// 响应包装方式
    #[serde(default)]
    pub envelope: ResponseEnvelope,
}

/// 解析后的网关运行参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub deployment_mode: DeploymentMode,
    pub extraction_mode: TargetExtractionMode,
    /// 不含结尾 `/` 的路由前缀，例如 `/proxy`
    pub route_path: String,
    pub target_param: String,
    pub timeout: TimeoutMillis,
    pub total_deadline: Option<TimeoutMillis>,
    pub user_agent: String,
    pub usage_example: String,
}

impl GatewayConfig {
    /// 校验并解析为运行参数
    pub fn resolve(&self) -> ConfigResult<GatewaySettings> {
        self.validate()?;

        let mode = self.deployment_mode;
        let extraction_mode = self.extraction_mode.unwrap_or(match mode {
            DeploymentMode::Local => TargetExtractionMode::PathSuffix,
            DeploymentMode::Serverless => TargetExtractionMode::QueryParam,
        });

        let route_path = self
            .route_path
            .as_deref()
            .unwrap_or(match mode {
                DeploymentMode::Local => "/proxy",
                DeploymentMode::Serverless => "/api/proxy",
            })
            .trim_end_matches('/')
            .to_string();

        let user_agent = self.user_agent.clone().unwrap_or_else(|| {
            match mode {
                DeploymentMode::Local => "Local-CORS-Proxy/1.0",
                DeploymentMode::Serverless => "Serverless-CORS-Proxy/1.0",
            }
            .to_string()
        });

        let usage_example = self.usage_example.clone().unwrap_or_else(|| {
            match extraction_mode {
                TargetExtractionMode::QueryParam => format!(
                    "GET {route_path}?{}=https://example.com/api",
                    self.target_param
                ),
                TargetExtractionMode::PathSuffix => {
                    format!("GET {route_path}/https://example.com/api")
                }
            }
        });

        Ok(GatewaySettings {
            deployment_mode: mode,
            extraction_mode,
            route_path,
            target_param: self.target_param.clone(),
            timeout: self.timeout_ms,
            total_deadline: self.total_deadline_ms,
            user_agent,
            usage_example,
        })
    }

    /// 验证配置有效性
    pub fn validate(&self) -> ConfigResult<()> {
        ensure!(
            self.timeout_ms.as_millis() > 0,
            ConfigError::invalid("gateway.timeout_ms", "must be greater than 0")
        );
        if let Some(deadline) = self.total_deadline_ms {
            ensure!(
                deadline.as_millis() > 0,
                ConfigError::invalid("gateway.total_deadline_ms", "must be greater than 0")
            );
        }
        ensure!(
            !self.target_param.trim().is_empty(),
            ConfigError::invalid("gateway.target_param", "must not be empty")
        );
        if let Some(route) = &self.route_path {
            ensure!(
                route.starts_with('/') && route.trim_end_matches('/').len() > 1,
                ConfigError::invalid(
                    "gateway.route_path",
                    format!("must start with '/' and name a route, got '{route}'")
                )
            );
        }
        if let Some(agent) = &self.user_agent {
            ensure!(
                axum::http::HeaderValue::from_str(agent).is_ok(),
                ConfigError::invalid("gateway.user_agent", "is not a valid header value")
            );
        }

        let mut names = HashSet::new();
        for (index, relay) in self.relays.iter().enumerate() {
            let field = format!("gateway.relays[{index}]");
            ensure!(
                !relay.name.trim().is_empty(),
                ConfigError::invalid(format!("{field}.name"), "must not be empty")
            );
            ensure!(
                relay.name != "direct",
                ConfigError::invalid(format!("{field}.name"), "'direct' is reserved")
            );
            ensure!(
                names.insert(relay.name.as_str()),
                ConfigError::invalid(
                    format!("{field}.name"),
                    format!("duplicate relay name '{}'", relay.name)
                )
            );
            let parsed = url::Url::parse(&relay.base_url).map_err(|e| {
                ConfigError::invalid(format!("{field}.base_url"), format!("{e}"))
            })?;
            ensure!(
                matches!(parsed.scheme(), "http" | "https"),
                ConfigError::invalid(
                    format!("{field}.base_url"),
                    format!("unsupported scheme '{}'", parsed.scheme())
                )
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn relay(name: &str, base_url: &str) -> RelayProviderConfig {
        RelayProviderConfig {
            name: name.to_string(),
            base_url: base_url.to_string(),
            url_encoding: UrlEncodingStyle::PathAppended,
            envelope: ResponseEnvelope::Raw,
        }
    }

    #[test]
    fn test_local_mode_defaults() {
        let settings = GatewayConfig::default().resolve().unwrap();
        assert_eq!(settings.extraction_mode, TargetExtractionMode::PathSuffix);
        assert_eq!(settings.route_path, "/proxy");
        assert_eq!(settings.user_agent, "Local-CORS-Proxy/1.0");
        assert_eq!(settings.usage_example, "GET /proxy/https://example.com/api");
        assert_eq!(settings.timeout, TimeoutMillis::new(30_000));
        assert_eq!(settings.total_deadline, None);
    }

    #[test]
    fn test_serverless_mode_defaults() {
        let config = GatewayConfig {
            deployment_mode: DeploymentMode::Serverless,
            ..GatewayConfig::default()
        };
        let settings = config.resolve().unwrap();
        assert_eq!(settings.extraction_mode, TargetExtractionMode::QueryParam);
        assert_eq!(settings.route_path, "/api/proxy");
        assert_eq!(settings.user_agent, "Serverless-CORS-Proxy/1.0");
        assert_eq!(
            settings.usage_example,
            "GET /api/proxy?targetUrl=https://example.com/api"
        );
    }

    #[test]
    fn test_explicit_fields_override_mode() {
        let config = GatewayConfig {
            deployment_mode: DeploymentMode::Local,
            extraction_mode: Some(TargetExtractionMode::QueryParam),
            route_path: Some("/relay/".to_string()),
            user_agent: Some("ExploreID-Gateway/2.0".to_string()),
            ..GatewayConfig::default()
        };
        let settings = config.resolve().unwrap();
        assert_eq!(settings.extraction_mode, TargetExtractionMode::QueryParam);
        assert_eq!(settings.route_path, "/relay");
        assert_eq!(settings.user_agent, "ExploreID-Gateway/2.0");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let zero_timeout = GatewayConfig {
            timeout_ms: TimeoutMillis::new(0),
            ..GatewayConfig::default()
        };
        assert!(zero_timeout.resolve().is_err());

        let bad_route = GatewayConfig {
            route_path: Some("proxy".to_string()),
            ..GatewayConfig::default()
        };
        assert!(bad_route.resolve().is_err());

        let root_route = GatewayConfig {
            route_path: Some("/".to_string()),
            ..GatewayConfig::default()
        };
        assert!(root_route.resolve().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_relays() {
        let duplicate = GatewayConfig {
            relays: vec![
                relay("bridged", "https://cors.bridged.cc/"),
                relay("bridged", "https://thingproxy.freeboard.io/fetch/"),
            ],
            ..GatewayConfig::default()
        };
        let err = duplicate.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate relay name"));

        let relative = GatewayConfig {
            relays: vec![relay("relative", "/fetch/")],
            ..GatewayConfig::default()
        };
        assert!(relative.validate().is_err());

        let reserved = GatewayConfig {
            relays: vec![relay("direct", "https://cors.bridged.cc/")],
            ..GatewayConfig::default()
        };
        assert!(reserved.validate().is_err());
    }

    #[test]
    fn test_relays_parse_from_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            deployment_mode = "serverless"
            timeout_ms = 5000

            [[relays]]
            name = "allorigins"
            base_url = "https://api.allorigins.win/get?url="
            url_encoding = "query_param_encoded"
            envelope = "contents"

            [[relays]]
            name = "thingproxy"
            base_url = "https://thingproxy.freeboard.io/fetch/"
            url_encoding = "path_appended"
            "#,
        )
        .unwrap();

        assert_eq!(config.timeout_ms, TimeoutMillis::new(5000));
        assert_eq!(config.relays.len(), 2);
        assert_eq!(config.relays[0].envelope, ResponseEnvelope::Contents);
        assert_eq!(config.relays[1].envelope, ResponseEnvelope::Raw);
        assert!(config.validate().is_ok());
    }
}
