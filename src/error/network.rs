use thiserror::Error;

/// 单次出站尝试的传输层错误
///
/// 只有这些错误会让转发器切换到下一个中继；上游返回的 4xx/5xx 不属于此类。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid outbound url: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// 稳定的机器可读错误码，写入错误响应的 `details.code`
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "TIMEOUT",
            Self::Connect(_) => "CONNECT_ERROR",
            Self::Body(_) => "BODY_ERROR",
            Self::Request(_) => "REQUEST_ERROR",
            Self::InvalidUrl(_) => "INVALID_URL",
        }
    }

    /// 按 reqwest 错误种类归类
    #[must_use]
    pub fn from_reqwest(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_ms }
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}
