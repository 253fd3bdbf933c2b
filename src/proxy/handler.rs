//! # 请求处理器
//!
//! 代理路由走 fallback：未匹配 `/health` 的请求都进入 `gateway_handler`，
//! 由它判断是否属于代理路由，否则返回 404。

use crate::error::{ErrorCategory, ProxyError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::proxy::middleware::RequestId;
use crate::proxy::request_normalizer;
use crate::proxy::response::{forward_result_response, json_response};
use crate::proxy::state::GatewayState;
use crate::proxy::types::duration_millis;
use crate::{ldebug, lerror, linfo, lwarn};
use axum::Extension;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http_body_util::LengthLimitError;
use serde_json::json;

/// 网关入口
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    Extension(request_id): Extension<RequestId>,
    request: Request,
) -> Response {
    match handle_gateway(&state, &request_id, request).await {
        Ok(response) => response,
        Err(err) => {
            let (status, code) = err.to_http_response_parts();
            match err.category() {
                ErrorCategory::Client => lwarn!(
                    request_id,
                    LogStage::ResponseFailure,
                    LogComponent::Handler,
                    "request_rejected",
                    &err.to_string(),
                    status_code = status.as_u16(),
                    error_code = code
                ),
                ErrorCategory::Server => lerror!(
                    request_id,
                    LogStage::ResponseFailure,
                    LogComponent::Handler,
                    "request_failed",
                    &err.to_string(),
                    status_code = status.as_u16(),
                    error_code = code
                ),
            }
            err.into_response()
        }
    }
}

async fn handle_gateway(
    state: &GatewayState,
    request_id: &RequestId,
    request: Request,
) -> Result<Response> {
    let settings = state.settings();
    let (parts, body) = request.into_parts();

    if !request_normalizer::is_proxy_route(settings, parts.uri.path()) {
        return Err(ProxyError::not_found(
            parts.uri.path(),
            settings.usage_example.as_str(),
        ));
    }

    linfo!(
        request_id,
        LogStage::RequestStart,
        LogComponent::Handler,
        "request_received",
        "proxy request received",
        method = %parts.method,
        path = %parts.uri.path()
    );

    let body = read_body(&parts.headers, body, state.max_body_bytes()).await?;
    let forward_request = request_normalizer::normalize(
        settings,
        &parts.method,
        &parts.uri,
        &parts.headers,
        body,
    )?;

    ldebug!(
        request_id,
        LogStage::Normalize,
        LogComponent::Normalizer,
        "request_normalized",
        "target extracted",
        target = %forward_request.target_url,
        method = %forward_request.method,
        has_body = forward_request.body.is_some()
    );

    // 入站请求被丢弃（客户端断开）时 guard 会取消该令牌
    let cancel = state.shutdown_token().child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let result = state
        .forwarder()
        .forward(&forward_request, request_id.as_str(), &cancel)
        .await?;

    linfo!(
        request_id,
        LogStage::Response,
        LogComponent::Handler,
        "response_sent",
        "proxy request completed",
        status_code = result.status.as_u16(),
        provider = %result.succeeded_via,
        attempts = result.attempts,
        elapsed_ms = duration_millis(result.elapsed)
    );

    Ok(forward_result_response(result))
}

async fn read_body(headers: &HeaderMap, body: axum::body::Body, limit: usize) -> Result<Bytes> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared.is_some_and(|length| length > limit) {
        return Err(ProxyError::PayloadTooLarge { limit });
    }

    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if is_length_limit_error(&e) {
            ProxyError::PayloadTooLarge { limit }
        } else {
            ProxyError::bad_request_with_source("failed to read request body", e)
        }
    })
}

fn is_length_limit_error(err: &axum::Error) -> bool {
    let mut source = Some(err as &(dyn std::error::Error + 'static));
    while let Some(current) = source {
        if current.is::<LengthLimitError>() {
            return true;
        }
        source = current.source();
    }
    false
}

/// 健康检查
pub async fn health_handler(State(state): State<GatewayState>) -> Response {
    let settings = state.settings();
    json_response(
        StatusCode::OK,
        &json!({
            "status": "ok",
            "message": "CORS Proxy Server Running",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "mode": settings.deployment_mode.as_str(),
            "route": settings.route_path,
            "providers": state.forwarder().chain().step_names(),
        }),
    )
}
