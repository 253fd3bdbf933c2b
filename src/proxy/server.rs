//! # 网关服务器
//!
//! Axum HTTP 服务器：`/health` + fallback 代理路由，支持优雅关闭。

use crate::config::AppConfig;
use crate::error::{ProxyError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::proxy::forwarding::RequestForwarder;
use crate::proxy::handler::{gateway_handler, health_handler};
use crate::proxy::middleware::request_id_middleware;
use crate::proxy::provider::RelayChain;
use crate::proxy::state::GatewayState;
use crate::proxy::upstream::{HttpTransport, ReqwestTransport};
use crate::{linfo, lwarn};
use axum::Router;
use axum::http::Method;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::middleware::from_fn;
use axum::routing::get;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// 网关服务器
pub struct ProxyServer {
    config: Arc<AppConfig>,
    state: GatewayState,
}

impl ProxyServer {
    /// 使用 reqwest 传输层创建
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        let transport = ReqwestTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// 使用指定传输层创建
    pub fn with_transport(config: Arc<AppConfig>, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let settings = config.gateway.resolve()?;
        let chain = RelayChain::from_config(&config.gateway.relays);
        let forwarder = RequestForwarder::new(transport, chain, settings.total_deadline);
        let state = GatewayState::new(
            settings,
            forwarder,
            config.server.max_request_body_bytes,
            tokio_util::sync::CancellationToken::new(),
        );

        Ok(Self { config, state })
    }

    #[must_use]
    pub const fn state(&self) -> &GatewayState {
        &self.state
    }

    /// 创建路由器
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// 绑定配置中的地址
    pub async fn bind(&self) -> Result<TcpListener> {
        let address = self.config.server.bind_address()?;
        TcpListener::bind(address).await.map_err(|e| {
            ProxyError::server_start_with_source(format!("failed to bind {address}"), e)
        })
    }

    /// 绑定并运行，直到 `shutdown` 完成
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve_with_listener(listener, shutdown).await
    }

    /// 在已绑定的监听器上运行
    ///
    /// 收到关闭信号后停止接受新连接；宽限期结束时取消所有仍在进行的转发。
    pub async fn serve_with_listener<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr: Option<SocketAddr> = listener.local_addr().ok();
        let settings = self.state.settings();
        let providers = self.state.forwarder().chain().step_names();

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "server_listening",
            "CORS gateway listening",
            address = ?local_addr,
            mode = %settings.deployment_mode,
            route = %settings.route_path,
            extraction = ?settings.extraction_mode,
            timeout_ms = settings.timeout.as_millis(),
            providers = ?providers
        );

        let token = self.state.shutdown_token().clone();
        let grace = Duration::from_secs(self.config.server.shutdown_grace_seconds);
        let shutdown_signal = async move {
            shutdown.await;
            linfo!(
                "system",
                LogStage::Shutdown,
                LogComponent::ServerSetup,
                "shutdown_started",
                "shutdown signal received, draining in-flight requests",
                grace_seconds = grace.as_secs()
            );
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                if !token.is_cancelled() {
                    lwarn!(
                        "system",
                        LogStage::Shutdown,
                        LogComponent::ServerSetup,
                        "grace_period_elapsed",
                        "grace period elapsed, cancelling in-flight forwards"
                    );
                    token.cancel();
                }
            });
        };

        let router = self.router();
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ProxyError::server_start_with_source("server terminated with error", e))?;

        self.state.shutdown_token().cancel();
        linfo!(
            "system",
            LogStage::Shutdown,
            LogComponent::ServerSetup,
            "server_stopped",
            "CORS gateway stopped"
        );
        Ok(())
    }
}

/// 预检结果缓存时间
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86_400);

/// CORS：任意来源；OPTIONS 在此直接应答，不进入代理路由
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(PREFLIGHT_MAX_AGE)
}

/// 创建路由器
pub fn create_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .fallback(gateway_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(request_id_middleware))
                .layer(cors_layer()),
        )
        .with_state(state)
}

/// 等待 Ctrl+C 或 SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            lwarn!(
                "system",
                LogStage::Shutdown,
                LogComponent::Main,
                "ctrl_c_listener_failed",
                &format!("failed to listen for Ctrl+C: {e}")
            );
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                lwarn!(
                    "system",
                    LogStage::Shutdown,
                    LogComponent::Main,
                    "sigterm_listener_failed",
                    &format!("failed to listen for SIGTERM: {e}")
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        MockHttpServer, RelayFixture, closed_port_url, init_test_env, public_relays, test_config,
    };
    use crate::types::{DeploymentMode, ResponseEnvelope};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn proxy_request(target: &str) -> Request<Body> {
        Request::builder()
            .uri(format!(
                "/api/proxy?targetUrl={}",
                urlencoding::encode(target)
            ))
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_public_relays_build_full_chain() {
        let config = test_config(DeploymentMode::Local, 30_000, public_relays());
        let server = ProxyServer::new(Arc::new(config)).unwrap();

        assert_eq!(
            server.state().forwarder().chain().step_names(),
            vec![
                "direct",
                "cors.bridged.cc",
                "thingproxy",
                "allorigins",
                "cors-anywhere"
            ]
        );
        assert_eq!(server.state().settings().route_path, "/proxy");
    }

    #[tokio::test]
    async fn test_router_falls_back_to_wrapped_relay() {
        init_test_env();
        let relay = MockHttpServer::start().await;
        relay
            .mock_json("GET", "/get", 200, json!({"contents": "{\"ok\":true}"}))
            .await;

        let config = test_config(
            DeploymentMode::Serverless,
            1000,
            vec![
                RelayFixture::new("allorigins", relay.url("/get?url="))
                    .query_encoded()
                    .envelope(ResponseEnvelope::Contents)
                    .build(),
            ],
        );
        let router = ProxyServer::new(Arc::new(config)).unwrap().router();

        let target = format!("{}/sheet", closed_port_url());
        let response = router.oneshot(proxy_request(&target)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-proxy-provider"], "allorigins");
        assert_eq!(json_body(response).await, json!({"ok": true}));

        let received = relay.received_requests().await;
        assert_eq!(received.len(), 1);
        assert_eq!(
            received[0].url.query_pairs().next().map(|(_, v)| v.into_owned()),
            Some(target)
        );
    }

    #[tokio::test]
    async fn test_router_passes_text_through() {
        init_test_env();
        let upstream = MockHttpServer::start().await;
        upstream.mock_text("GET", "/notes", 200, "just text").await;

        let config = test_config(DeploymentMode::Serverless, 1000, vec![]);
        let router = ProxyServer::new(Arc::new(config)).unwrap().router();
        let response = router
            .oneshot(proxy_request(&upstream.url("/notes")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/plain");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"just text");
    }

    #[tokio::test]
    async fn test_router_times_out_slow_direct() {
        init_test_env();
        let upstream = MockHttpServer::start().await;
        upstream
            .mock_delayed("GET", "/slow", Duration::from_secs(3))
            .await;
        let relay = MockHttpServer::start().await;
        relay.mock_json("GET", "/relay", 200, json!({"via": "relay"})).await;

        let config = test_config(
            DeploymentMode::Serverless,
            250,
            vec![
                RelayFixture::new("relay", relay.url("/relay?u="))
                    .query_encoded()
                    .build(),
            ],
        );
        let router = ProxyServer::new(Arc::new(config)).unwrap().router();
        let response = router
            .oneshot(proxy_request(&upstream.url("/slow")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-proxy-attempts"], "2");
        assert_eq!(json_body(response).await, json!({"via": "relay"}));
    }
}
