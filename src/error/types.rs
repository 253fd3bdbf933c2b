//! # 错误类型定义

use super::config::ConfigError;
use super::network::TransportError;
use super::ErrorCategory;
use axum::http::StatusCode;
use thiserror::Error;

/// 转发链中单次失败尝试的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// 尝试序号（从 1 开始，1 为直连）
    pub attempt: usize,
    /// 提供者名称（直连为 `direct`）
    pub provider: String,
    /// 传输层错误
    pub error: TransportError,
    /// 本次尝试耗时（毫秒）
    pub elapsed_ms: u64,
}

/// 网关主要错误类型
#[derive(Debug, Error)]
pub enum ProxyError {
    /// 配置相关错误
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 请求缺少目标地址
    #[error("Missing {param} parameter")]
    MissingTarget { param: String, usage: String },

    /// 目标地址不是合法的绝对 URL
    #[error("Invalid {param} parameter: {reason}")]
    InvalidTarget {
        param: String,
        target: String,
        reason: String,
        usage: String,
    },

    /// 不支持的请求方法
    #[error("Method {method} is not supported")]
    UnsupportedMethod { method: String },

    /// 未匹配的路由
    #[error("No route for {path}")]
    NotFound { path: String, usage: String },

    /// 请求体超出限制
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// 请求体读取失败等客户端错误
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 直连与所有中继均以传输错误失败
    #[error("All {} forwarding attempts failed; last error: {}", .attempts.len(), last_attempt_message(.attempts))]
    AllProvidersExhausted { attempts: Vec<AttemptFailure> },

    /// 调用方断开或服务关闭导致的取消
    #[error("Forwarding cancelled: {message}")]
    Cancelled { message: String },

    /// IO相关错误
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// 系统内部错误
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 服务器启动错误
    #[error("Server start error: {message}")]
    ServerStart {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 带上下文的错误
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ProxyError>,
    },
}

fn last_attempt_message(attempts: &[AttemptFailure]) -> String {
    attempts.last().map_or_else(
        || "no attempts were made".to_string(),
        |failure| format!("{} ({})", failure.error, failure.provider),
    )
}

impl ProxyError {
    /// 将错误转换为HTTP状态码和错误代码
    #[must_use]
    pub fn to_http_response_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Config { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Self::MissingTarget { .. } => (StatusCode::BAD_REQUEST, "MISSING_TARGET"),
            Self::InvalidTarget { .. } => (StatusCode::BAD_REQUEST, "INVALID_TARGET"),
            Self::UnsupportedMethod { .. } => {
                (StatusCode::METHOD_NOT_ALLOWED, "UNSUPPORTED_METHOD")
            }
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::PayloadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::BadRequest { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::AllProvidersExhausted { attempts } => (
                StatusCode::BAD_GATEWAY,
                attempts
                    .last()
                    .map_or("ALL_PROVIDERS_EXHAUSTED", |failure| failure.error.code()),
            ),
            Self::Cancelled { .. } => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
            Self::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Self::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::ServerStart { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_START_ERROR")
            }
            Self::Context { source, .. } => source.to_http_response_parts(),
        }
    }

    /// 错误名称，写入错误响应的 `details.name`
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Config { .. } => "ConfigError",
            Self::MissingTarget { .. } => "MissingTargetError",
            Self::InvalidTarget { .. } => "InvalidTargetError",
            Self::UnsupportedMethod { .. } => "UnsupportedMethodError",
            Self::NotFound { .. } => "NotFoundError",
            Self::PayloadTooLarge { .. } => "PayloadTooLargeError",
            Self::BadRequest { .. } => "BadRequestError",
            Self::AllProvidersExhausted { .. } => "AllProvidersExhaustedError",
            Self::Cancelled { .. } => "CancelledError",
            Self::Io { .. } => "IoError",
            Self::Internal { .. } => "InternalError",
            Self::ServerStart { .. } => "ServerStartError",
            Self::Context { source, .. } => source.name(),
        }
    }

    /// 错误分类
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        if self.to_http_response_parts().0.is_client_error() {
            ErrorCategory::Client
        } else {
            ErrorCategory::Server
        }
    }

    /// 剥离上下文包装后的原始错误
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建缺少目标地址错误
    pub fn missing_target<P: Into<String>, U: Into<String>>(param: P, usage: U) -> Self {
        Self::MissingTarget {
            param: param.into(),
            usage: usage.into(),
        }
    }

    /// 创建无效目标地址错误
    pub fn invalid_target(
        param: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
        usage: impl Into<String>,
    ) -> Self {
        Self::InvalidTarget {
            param: param.into(),
            target: target.into(),
            reason: reason.into(),
            usage: usage.into(),
        }
    }

    /// 创建不支持的方法错误
    pub fn unsupported_method<T: Into<String>>(method: T) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// 创建路由未找到错误
    pub fn not_found<P: Into<String>, U: Into<String>>(path: P, usage: U) -> Self {
        Self::NotFound {
            path: path.into(),
            usage: usage.into(),
        }
    }

    /// 创建客户端请求错误
    pub fn bad_request_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::BadRequest {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建链路耗尽错误
    #[must_use]
    pub const fn all_providers_exhausted(attempts: Vec<AttemptFailure>) -> Self {
        Self::AllProvidersExhausted { attempts }
    }

    /// 创建取消错误
    pub fn cancelled<T: Into<String>>(message: T) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// 创建带来源的内部错误
    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建带来源的服务器启动错误
    pub fn server_start_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::ServerStart {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

// 自动转换常见错误类型
impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: "file or socket operation failed".to_string(),
            source: err,
        }
    }
}

impl From<ConfigError> for ProxyError {
    fn from(err: ConfigError) -> Self {
        Self::config_with_source(err.to_string(), err)
    }
}

impl From<toml::de::Error> for ProxyError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML parse failed", err)
    }
}
