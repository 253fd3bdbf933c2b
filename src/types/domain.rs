use axum::http;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 单次转发尝试的超时（毫秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeoutMillis(pub u64);

impl TimeoutMillis {
    /// 原始代理脚本使用的 30 秒
    pub const DEFAULT: Self = Self(30_000);

    #[must_use]
    pub const fn new(millis: u64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn as_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl Default for TimeoutMillis {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for TimeoutMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// 部署模式：替代按主机名嗅探环境的做法，启动时确定一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMode {
    /// 本地独立进程，`/proxy/<url>` 路径后缀
    #[default]
    Local,
    /// 无服务器函数，`/api/proxy?targetUrl=<url>` 查询参数
    Serverless,
}

impl DeploymentMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Serverless => "serverless",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "serverless" => Ok(Self::Serverless),
            other => Err(format!("unknown deployment mode: {other}")),
        }
    }
}

/// 目标地址的提取方式，每个部署只启用一种
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetExtractionMode {
    /// `<route>?targetUrl=<percent-encoded url>`
    QueryParam,
    /// `<route>/<url>`
    PathSuffix,
}

impl FromStr for TargetExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "query_param" => Ok(Self::QueryParam),
            "path_suffix" => Ok(Self::PathSuffix),
            other => Err(format!("unknown extraction mode: {other}")),
        }
    }
}

/// 中继对目标地址的编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlEncodingStyle {
    /// `base_url + percent_encode(target)`，如 `https://api.allorigins.win/get?url=`
    QueryParamEncoded,
    /// `base_url + target`，如 `https://thingproxy.freeboard.io/fetch/`
    PathAppended,
}

/// 中继对真实响应的包装方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseEnvelope {
    /// 原样返回
    #[default]
    Raw,
    /// `{ "contents": "<json-or-text>" }`
    Contents,
    /// `{ "data": ... }`
    Data,
}

impl ResponseEnvelope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Contents => "contents",
            Self::Data => "data",
        }
    }
}

/// 网关接受的请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
        }
    }

    /// 只有 POST/PUT/PATCH 携带请求体
    #[must_use]
    pub const fn carries_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    #[must_use]
    pub fn to_http(self) -> http::Method {
        match self {
            Self::Get => http::Method::GET,
            Self::Post => http::Method::POST,
            Self::Put => http::Method::PUT,
            Self::Delete => http::Method::DELETE,
            Self::Patch => http::Method::PATCH,
            Self::Options => http::Method::OPTIONS,
        }
    }
}

impl TryFrom<&http::Method> for HttpMethod {
    type Error = String;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        [
            Self::Get,
            Self::Post,
            Self::Put,
            Self::Delete,
            Self::Patch,
            Self::Options,
        ]
        .into_iter()
        .find(|candidate| candidate.as_str() == method.as_str())
        .ok_or_else(|| method.as_str().to_string())
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
