//! # 入站请求规范化
//!
//! 从入站请求中提取目标地址（恰好解码一次），过滤请求头，决定是否携带请求体。

use crate::config::GatewaySettings;
use crate::error::{ProxyError, Result};
use crate::proxy::types::ForwardRequest;
use crate::types::{HttpMethod, TargetExtractionMode};
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderMap, HeaderValue, Method, Uri};
use bytes::Bytes;
use url::Url;

/// 未提供时使用的 Content-Type / Accept
const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// 路径是否属于代理路由
#[must_use]
pub fn is_proxy_route(settings: &GatewaySettings, path: &str) -> bool {
    let Some(rest) = path.strip_prefix(settings.route_path.as_str()) else {
        return false;
    };
    match settings.extraction_mode {
        TargetExtractionMode::QueryParam => rest.is_empty() || rest == "/",
        TargetExtractionMode::PathSuffix => rest.is_empty() || rest.starts_with('/'),
    }
}

/// 提取目标地址原文（已解码一次、未校验）
///
/// 查询参数模式只看 `target_param`；路径后缀模式下，入站查询串属于目标地址，原样拼回。
pub fn extract_target(settings: &GatewaySettings, uri: &Uri) -> Result<String> {
    let raw = match settings.extraction_mode {
        TargetExtractionMode::QueryParam => uri
            .query()
            .and_then(|query| find_query_value(query, &settings.target_param))
            .map(|value| decode_once(settings, value))
            .transpose()?,
        TargetExtractionMode::PathSuffix => {
            let suffix = uri
                .path()
                .strip_prefix(settings.route_path.as_str())
                .unwrap_or_default()
                .trim_start_matches('/');
            if suffix.is_empty() {
                None
            } else {
                let mut target = decode_once(settings, suffix)?;
                if let Some(query) = uri.query().filter(|query| !query.is_empty()) {
                    target.push('?');
                    target.push_str(query);
                }
                Some(target)
            }
        }
    };

    match raw {
        Some(target) if !target.trim().is_empty() => Ok(target.trim().to_string()),
        _ => Err(ProxyError::missing_target(
            settings.target_param.as_str(),
            settings.usage_example.as_str(),
        )),
    }
}

/// 校验目标地址为 http/https 绝对地址
pub fn parse_target(settings: &GatewaySettings, target: &str) -> Result<Url> {
    let invalid = |reason: String| {
        ProxyError::invalid_target(
            settings.target_param.as_str(),
            target,
            reason,
            settings.usage_example.as_str(),
        )
    };

    let url = Url::parse(target).map_err(|e| invalid(format!("not an absolute URL ({e})")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// 构建出站请求头：只保留白名单字段，补默认值，统一 User-Agent
pub fn forward_headers(settings: &GatewaySettings, inbound: &HeaderMap) -> Result<HeaderMap> {
    let default_media_type = HeaderValue::from_static(DEFAULT_MEDIA_TYPE);
    let mut headers = HeaderMap::with_capacity(4);

    headers.insert(
        CONTENT_TYPE,
        inbound
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| default_media_type.clone()),
    );
    headers.insert(
        ACCEPT,
        inbound.get(ACCEPT).cloned().unwrap_or(default_media_type),
    );
    if let Some(authorization) = inbound.get(AUTHORIZATION) {
        headers.insert(AUTHORIZATION, authorization.clone());
    }

    let user_agent = HeaderValue::from_str(&settings.user_agent).map_err(|e| {
        ProxyError::internal_with_source("configured user agent is not a valid header", e)
    })?;
    headers.insert(USER_AGENT, user_agent);

    Ok(headers)
}

/// 规范化入站请求
pub fn normalize(
    settings: &GatewaySettings,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<ForwardRequest> {
    let method = HttpMethod::try_from(method).map_err(ProxyError::unsupported_method)?;

    let target = extract_target(settings, uri)?;
    let target_url = parse_target(settings, &target)?;
    let headers = forward_headers(settings, headers)?;
    let body = (method.carries_body() && !body.is_empty()).then_some(body);

    Ok(ForwardRequest {
        target_url,
        method,
        headers,
        body,
        timeout: settings.timeout,
    })
}

fn find_query_value<'a>(query: &'a str, param: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == param).then_some(value)
    })
}

fn decode_once(settings: &GatewaySettings, raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| {
            ProxyError::invalid_target(
                settings.target_param.as_str(),
                raw,
                format!("percent-decoding produced invalid UTF-8 ({e})"),
                settings.usage_example.as_str(),
            )
        })
}
