//! 集成测试共用工具：路由驱动与响应读取，配置与上游模拟来自 `cors_gateway::testing`

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use cors_gateway::config::AppConfig;
use cors_gateway::proxy::ProxyServer;
use cors_gateway::testing::init_test_env;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub fn router(config: AppConfig) -> Router {
    init_test_env();
    ProxyServer::new(Arc::new(config)).unwrap().router()
}

pub async fn send(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> bytes::Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// 查询参数模式的代理地址
pub fn query_proxy_uri(target: &str) -> String {
    format!("/api/proxy?targetUrl={}", urlencoding::encode(target))
}
