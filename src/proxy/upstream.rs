//! # 出站传输层
//!
//! 转发器只依赖 `HttpTransport`，生产环境用 reqwest 实现，测试中替换为内存实现。

use crate::error::{ProxyError, Result, TransportResult};
use crate::error::network::TransportError;
use crate::proxy::types::{OutboundRequest, OutboundResponse, duration_millis};
use async_trait::async_trait;
use axum::http::header::CONTENT_TYPE;
use std::time::Duration;

/// 建立连接的上限，单次尝试的整体时限由转发器控制
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// 出站 HTTP 传输
///
/// 只有连接、超时、读取响应体等传输层失败返回 `Err`；任意状态码的响应都是 `Ok`。
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> TransportResult<OutboundResponse>;
}

/// 基于 reqwest 的传输实现
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// 使用默认客户端配置创建
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ProxyError::internal_with_source("failed to build HTTP client", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: OutboundRequest) -> TransportResult<OutboundResponse> {
        let timeout_ms = duration_millis(request.timeout);

        let mut builder = self
            .client
            .request(request.method.to_http(), &request.url)
            .headers(request.headers)
            .timeout(request.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e, timeout_ms))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(&e, timeout_ms))?;

        Ok(OutboundResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpMethod;
    use axum::http::HeaderMap;
    use bytes::Bytes;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn outbound(url: String, method: HttpMethod, body: Option<Bytes>) -> OutboundRequest {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        OutboundRequest {
            url,
            method,
            headers,
            body,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_error_status_is_not_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let response = transport
            .execute(outbound(format!("{}/missing", server.uri()), HttpMethod::Get, None))
            .await
            .unwrap();

        assert_eq!(response.status.as_u16(), 404);
        assert_eq!(response.body, Bytes::from_static(b"nope"));
    }

    #[tokio::test]
    async fn test_body_and_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"a":1}"#))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("content-type", "application/json")
                    .set_body_string(r#"{"ok":true}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let response = transport
            .execute(outbound(
                format!("{}/submit", server.uri()),
                HttpMethod::Post,
                Some(Bytes::from_static(br#"{"a":1}"#)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status.as_u16(), 201);
        assert_eq!(response.content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let mut request = outbound(server.uri(), HttpMethod::Get, None);
        request.timeout = Duration::from_millis(100);

        let err = transport.execute(request).await.unwrap_err();
        assert_eq!(err, TransportError::Timeout { timeout_ms: 100 });
    }
}
