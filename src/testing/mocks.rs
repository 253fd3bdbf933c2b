//! # 测试 Mock 对象
//!
//! 内存传输层（按地址前缀返回预设结果）与基于 wiremock 的真实 HTTP 上游。

use crate::error::TransportResult;
use crate::error::network::TransportError;
use crate::proxy::types::{OutboundRequest, OutboundResponse};
use crate::proxy::upstream::HttpTransport;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 预设的单次传输结果
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond(OutboundResponse),
    Fail(TransportError),
    /// 延迟后再给出内部结果
    Delay(Duration, Box<MockReply>),
}

/// 按地址前缀匹配的内存传输层，并记录每次调用
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Vec<(String, MockReply)>,
    calls: Mutex<Vec<OutboundRequest>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 地址以 `prefix` 开头的请求返回 `reply`，先注册的优先
    #[must_use]
    pub fn on(mut self, prefix: impl Into<String>, reply: MockReply) -> Self {
        self.routes.push((prefix.into(), reply));
        self
    }

    /// 已发生的调用（按时间顺序）
    #[must_use]
    pub fn calls(&self) -> Vec<OutboundRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn reply_for(&self, url: &str) -> MockReply {
        self.routes
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map_or_else(
                || MockReply::Fail(TransportError::Connect(format!("no mock route for {url}"))),
                |(_, reply)| reply.clone(),
            )
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: OutboundRequest) -> TransportResult<OutboundResponse> {
        let mut reply = self.reply_for(&request.url);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        loop {
            match reply {
                MockReply::Respond(response) => return Ok(response),
                MockReply::Fail(error) => return Err(error),
                MockReply::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}

/// 真实监听端口的上游模拟
pub struct MockHttpServer {
    server: MockServer,
}

impl MockHttpServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// 完整地址，例如 `http://127.0.0.1:PORT/api`
    #[must_use]
    pub fn url(&self, route: &str) -> String {
        format!("{}{route}", self.uri())
    }

    /// 挂载返回 JSON 的路由
    pub async fn mock_json(&self, http_method: &str, route: &str, status: u16, body: serde_json::Value) {
        Mock::given(method(http_method))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// 挂载返回纯文本的路由
    pub async fn mock_text(&self, http_method: &str, route: &str, status: u16, body: &str) {
        Mock::given(method(http_method))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_raw(body.to_string(), "text/plain"))
            .mount(&self.server)
            .await;
    }

    /// 挂载延迟响应的路由
    pub async fn mock_delayed(&self, http_method: &str, route: &str, delay: Duration) {
        Mock::given(method(http_method))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    /// 已收到的请求
    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}
