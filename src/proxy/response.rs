//! # 响应构建
//!
//! 统一的 JSON 错误体，以及把转发结果写回客户端。

use crate::error::ProxyError;
use crate::proxy::types::{ForwardResult, Payload};
use crate::types::ResponseEnvelope;
use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::{Value, json};

/// 产生结果的提供者
pub const PROXY_PROVIDER_HEADER: HeaderName = HeaderName::from_static("x-proxy-provider");
/// 实际使用的尝试次数
pub const PROXY_ATTEMPTS_HEADER: HeaderName = HeaderName::from_static("x-proxy-attempts");

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// 错误响应体
#[must_use]
pub fn error_payload(err: &ProxyError) -> Value {
    let (_, code) = err.to_http_response_parts();
    let root = err.root();

    match root {
        ProxyError::MissingTarget { usage, .. } => json!({
            "error": root.to_string(),
            "usage": usage,
        }),
        ProxyError::InvalidTarget {
            param,
            reason,
            usage,
            ..
        } => json!({
            "error": format!("Invalid {param} parameter"),
            "message": reason,
            "usage": usage,
        }),
        ProxyError::NotFound { usage, .. } => json!({
            "error": "Not Found",
            "message": root.to_string(),
            "usage": usage,
        }),
        ProxyError::AllProvidersExhausted { attempts } => json!({
            "error": "Proxy Error",
            "message": err.to_string(),
            "details": {
                "code": code,
                "name": err.name(),
                "attempts": attempts
                    .iter()
                    .map(|failure| json!({
                        "attempt": failure.attempt,
                        "provider": failure.provider,
                        "code": failure.error.code(),
                        "message": failure.error.to_string(),
                        "elapsed_ms": failure.elapsed_ms,
                    }))
                    .collect::<Vec<_>>(),
            },
        }),
        _ => json!({
            "error": "Proxy Error",
            "message": err.to_string(),
            "details": {
                "code": code,
                "name": err.name(),
            },
        }),
    }
}

/// JSON 响应
#[must_use]
pub fn json_response(status: StatusCode, payload: &Value) -> Response {
    let body = serde_json::to_vec(payload).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = (status, Body::from(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("private, no-store"));
    response
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, _) = self.to_http_response_parts();
        json_response(status, &error_payload(&self))
    }
}

/// 把转发结果写成客户端响应：状态码透传，响应体按解包结果输出
#[must_use]
pub fn forward_result_response(result: ForwardResult) -> Response {
    let unwrapped = result.envelope != ResponseEnvelope::Raw;
    let upstream_type = result
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok());

    let (body, content_type) = match result.parsed_body {
        Payload::Json(value) if unwrapped => (
            Bytes::from(serde_json::to_vec(&value).unwrap_or_default()),
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        ),
        Payload::Json(_) => (
            result.raw_body,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        ),
        Payload::Text(text) if unwrapped => (
            Bytes::from(text),
            HeaderValue::from_static(TEXT_CONTENT_TYPE),
        ),
        Payload::Text(text) => (
            Bytes::from(text),
            upstream_type.unwrap_or(HeaderValue::from_static(TEXT_CONTENT_TYPE)),
        ),
        Payload::Binary(bytes) => (
            bytes,
            upstream_type.unwrap_or(HeaderValue::from_static(BINARY_CONTENT_TYPE)),
        ),
    };

    let mut response = (result.status, Body::from(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    if let Ok(provider) = HeaderValue::from_str(result.succeeded_via.name()) {
        headers.insert(PROXY_PROVIDER_HEADER, provider);
    }
    headers.insert(PROXY_ATTEMPTS_HEADER, HeaderValue::from(result.attempts));
    response
}
