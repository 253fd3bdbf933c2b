//! # 日志配置模块
//!
//! 初始化 tracing 订阅器，并提供带请求上下文的结构化日志宏。
//!
//! 所有宏的参数顺序一致：`(request_id, LogStage, LogComponent, operation, message, 额外字段...)`，
//! 额外字段直接透传给 `tracing`，例如 `attempt = 2, provider = %name`。

use std::env;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt};

/// 请求处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    Startup,
    Shutdown,
    RequestStart,
    Normalize,
    Forward,
    Fallback,
    Unwrap,
    Response,
    ResponseFailure,
}

impl LogStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::RequestStart => "request_start",
            Self::Normalize => "normalize",
            Self::Forward => "forward",
            Self::Fallback => "fallback",
            Self::Unwrap => "unwrap",
            Self::Response => "response",
            Self::ResponseFailure => "response_failure",
        }
    }
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 产生日志的组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    Main,
    Config,
    ServerSetup,
    Normalizer,
    Forwarder,
    Unwrapper,
    Handler,
}

impl LogComponent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Config => "config",
            Self::ServerSetup => "server_setup",
            Self::Normalizer => "normalizer",
            Self::Forwarder => "forwarder",
            Self::Unwrapper => "unwrapper",
            Self::Handler => "handler",
        }
    }
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 内部实现：所有级别宏共用
#[doc(hidden)]
#[macro_export]
macro_rules! __log_event {
    ($level:ident, $request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(, $($field:tt)+)?) => {
        ::tracing::$level!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($field)+ ,)?
            "{}",
            $message
        )
    };
}

/// INFO 级别结构化日志
#[macro_export]
macro_rules! linfo {
    ($($args:tt)+) => { $crate::__log_event!(info, $($args)+) };
}

/// DEBUG 级别结构化日志
#[macro_export]
macro_rules! ldebug {
    ($($args:tt)+) => { $crate::__log_event!(debug, $($args)+) };
}

/// WARN 级别结构化日志
#[macro_export]
macro_rules! lwarn {
    ($($args:tt)+) => { $crate::__log_event!(warn, $($args)+) };
}

/// ERROR 级别结构化日志
#[macro_export]
macro_rules! lerror {
    ($($args:tt)+) => { $crate::__log_event!(error, $($args)+) };
}

/// 默认过滤规则
fn default_filter(level: &str) -> String {
    format!("{level},cors_gateway=debug,hyper=warn,reqwest=warn,tower_http=info")
}

/// 初始化日志系统
///
/// `RUST_LOG` 存在时优先使用，否则按传入级别（默认 `info`）构建过滤规则。
pub fn init_logging(log_level: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| default_filter(level));

    let result = tracing_subscriber::registry()
        .with(EnvFilter::try_new(&log_filter).unwrap_or_else(|_| EnvFilter::new(default_filter("info"))))
        .with(
            fmt_layer::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();

    if result.is_ok() {
        tracing::debug!(filter = %log_filter, "logging initialized");
    }
}

/// 环境变量设置指南
pub fn print_logging_help() {
    println!("📋 日志配置指南:");
    println!("  RUST_LOG=info                          # 标准日志级别");
    println!("  RUST_LOG=debug                         # 调试级别（包含每次转发尝试）");
    println!("  RUST_LOG=info,cors_gateway=trace       # 网关详细追踪");
    println!("  RUST_LOG=info,tower_http=debug         # 入站请求追踪");
}
