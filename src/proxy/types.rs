//! # 代理服务类型定义
//!
//! 单次请求生命周期内的瞬态数据，不跨请求共享、不缓存。

use crate::types::{HttpMethod, ResponseEnvelope, TimeoutMillis};
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

/// 规范化后的转发请求
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    /// 已解码、已校验的绝对地址
    pub target_url: Url,
    pub method: HttpMethod,
    /// 白名单过滤后的请求头
    pub headers: HeaderMap,
    /// 仅 POST/PUT/PATCH 且非空时存在
    pub body: Option<Bytes>,
    pub timeout: TimeoutMillis,
}

/// 发往直连目标或中继的单次出站请求
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// 本次尝试的时间预算
    pub timeout: Duration,
}

/// 传输层成功完成的出站响应（状态码可以是任意值）
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// 产生结果的尝试
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptSource {
    /// 直连目标
    Direct,
    /// 链中第 `index` 个中继（从 0 开始）
    Relay { index: usize, name: String },
}

impl AttemptSource {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Direct => "direct",
            Self::Relay { name, .. } => name,
        }
    }
}

impl fmt::Display for AttemptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 解包后的响应体
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// 可解析的 JSON
    Json(Value),
    /// 无法解析为 JSON 的 UTF-8 文本
    Text(String),
    /// 非 UTF-8 的原始字节
    Binary(Bytes),
}

impl Payload {
    /// 载荷类别，用于日志
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Text(_) => "text",
            Self::Binary(_) => "binary",
        }
    }
}

/// 一次成功转发的结果
#[derive(Debug, Clone)]
pub struct ForwardResult {
    /// 上游状态码，原样透传
    pub status: StatusCode,
    pub raw_body: Bytes,
    pub parsed_body: Payload,
    pub content_type: Option<String>,
    /// 解包时使用的包装方式
    pub envelope: ResponseEnvelope,
    pub succeeded_via: AttemptSource,
    /// 包含成功那一次在内的尝试次数
    pub attempts: usize,
    pub elapsed: Duration,
}

/// `Duration` 转毫秒，溢出时饱和
#[must_use]
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
