//! # 错误处理测试

use crate::error::network::TransportError;
use crate::error::{AttemptFailure, Context, ErrorCategory, ProxyError};
use axum::http::StatusCode;
use std::error::Error;

fn failure(attempt: usize, provider: &str, error: TransportError) -> AttemptFailure {
    AttemptFailure {
        attempt,
        provider: provider.to_string(),
        error,
        elapsed_ms: 5,
    }
}

#[test]
fn test_config_error_creation() {
    let err = ProxyError::config("relay list is empty");
    assert!(matches!(err, ProxyError::Config { .. }));
    assert_eq!(err.to_string(), "Configuration error: relay list is empty");
    assert_eq!(err.category(), ErrorCategory::Server);
}

#[test]
fn test_config_error_with_source() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let err = ProxyError::config_with_source("config file load failed", io_err);

    assert!(err.to_string().contains("config file load failed"));
    assert!(err.source().is_some());
}

#[test]
fn test_missing_target_maps_to_bad_request() {
    let err = ProxyError::missing_target("targetUrl", "GET /proxy?targetUrl=...");
    assert_eq!(err.to_string(), "Missing targetUrl parameter");

    let (status, code) = err.to_http_response_parts();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(code, "MISSING_TARGET");
    assert_eq!(err.name(), "MissingTargetError");
    assert_eq!(err.category(), ErrorCategory::Client);
}

#[test]
fn test_exhausted_error_reports_last_transport_failure() {
    let err = ProxyError::all_providers_exhausted(vec![
        failure(1, "direct", TransportError::Connect("refused".into())),
        failure(2, "allorigins", TransportError::Timeout { timeout_ms: 100 }),
    ]);

    let (status, code) = err.to_http_response_parts();
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(code, "TIMEOUT");
    assert_eq!(err.name(), "AllProvidersExhaustedError");

    let message = err.to_string();
    assert!(message.contains("All 2 forwarding attempts failed"));
    assert!(message.contains("allorigins"));
}

#[test]
fn test_exhausted_error_without_attempts() {
    let err = ProxyError::all_providers_exhausted(Vec::new());
    assert_eq!(err.to_http_response_parts().1, "ALL_PROVIDERS_EXHAUSTED");
    assert!(err.to_string().contains("no attempts were made"));
}

#[test]
fn test_context_preserves_inner_status() {
    let result: Result<(), ProxyError> =
        Err(ProxyError::missing_target("targetUrl", "usage"));
    let err = result.context("normalizing request").unwrap_err();

    assert!(matches!(err, ProxyError::Context { .. }));
    assert!(err.to_string().starts_with("normalizing request: "));
    assert_eq!(err.to_http_response_parts().0, StatusCode::BAD_REQUEST);
    assert_eq!(err.name(), "MissingTargetError");
}

#[test]
fn test_auto_conversion_from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "busy");
    let proxy_err: ProxyError = io_err.into();

    assert!(matches!(proxy_err, ProxyError::Io { .. }));
    assert_eq!(proxy_err.to_http_response_parts().1, "IO_ERROR");
}

#[test]
fn test_auto_conversion_from_toml_error() {
    let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
    let proxy_err: ProxyError = toml_err.into();

    assert!(matches!(proxy_err, ProxyError::Config { .. }));
    assert!(proxy_err.to_string().contains("TOML parse failed"));
}

#[test]
fn test_transport_error_codes_are_stable() {
    assert_eq!(TransportError::Timeout { timeout_ms: 1 }.code(), "TIMEOUT");
    assert_eq!(TransportError::Connect(String::new()).code(), "CONNECT_ERROR");
    assert_eq!(TransportError::Body(String::new()).code(), "BODY_ERROR");
    assert_eq!(TransportError::Request(String::new()).code(), "REQUEST_ERROR");
    assert_eq!(TransportError::InvalidUrl(String::new()).code(), "INVALID_URL");
}

#[test]
fn test_ensure_macro_returns_converted_error() {
    fn check(port: u16) -> crate::error::Result<u16> {
        crate::ensure!(
            port != 0,
            crate::error::config::ConfigError::invalid("server.port", "must be non-zero")
        );
        Ok(port)
    }

    assert_eq!(check(8080).unwrap(), 8080);
    let err = check(0).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}
