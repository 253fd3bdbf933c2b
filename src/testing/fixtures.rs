//! # 测试数据 Fixtures
//!
//! 常用的中继配置与示例配置文件

use crate::config::RelayProviderConfig;
use crate::types::{ResponseEnvelope, UrlEncodingStyle};

/// 中继配置构建器
#[derive(Debug, Clone)]
pub struct RelayFixture {
    name: String,
    base_url: String,
    url_encoding: UrlEncodingStyle,
    envelope: ResponseEnvelope,
}

impl RelayFixture {
    /// 默认路径拼接、原样返回
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            url_encoding: UrlEncodingStyle::PathAppended,
            envelope: ResponseEnvelope::Raw,
        }
    }

    #[must_use]
    pub const fn query_encoded(mut self) -> Self {
        self.url_encoding = UrlEncodingStyle::QueryParamEncoded;
        self
    }

    #[must_use]
    pub const fn envelope(mut self, envelope: ResponseEnvelope) -> Self {
        self.envelope = envelope;
        self
    }

    #[must_use]
    pub fn build(self) -> RelayProviderConfig {
        RelayProviderConfig {
            name: self.name,
            base_url: self.base_url,
            url_encoding: self.url_encoding,
            envelope: self.envelope,
        }
    }
}

/// 生产环境使用的四个公共中继
#[must_use]
pub fn public_relays() -> Vec<RelayProviderConfig> {
    vec![
        RelayFixture::new("cors.bridged.cc", "https://cors.bridged.cc/").build(),
        RelayFixture::new("thingproxy", "https://thingproxy.freeboard.io/fetch/").build(),
        RelayFixture::new("allorigins", "https://api.allorigins.win/get?url=")
            .query_encoded()
            .envelope(ResponseEnvelope::Contents)
            .build(),
        RelayFixture::new("cors-anywhere", "https://cors-anywhere.herokuapp.com/").build(),
    ]
}

/// 最小的无服务器模式配置文件
pub const SERVERLESS_TOML: &str = r#"
[server]
host = "127.0.0.1"
port = 3001

[gateway]
deployment_mode = "serverless"
timeout_ms = 5000

[[gateway.relays]]
name = "allorigins"
base_url = "https://api.allorigins.win/get?url="
url_encoding = "query_param_encoded"
envelope = "contents"
"#;
