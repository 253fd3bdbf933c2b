//! # 中继提供者与回退链
//!
//! 链的第 0 步永远是直连，其后按配置顺序排列中继。链在启动时构建，运行期只读。

use crate::config::RelayProviderConfig;
use crate::proxy::types::AttemptSource;
use crate::types::{ResponseEnvelope, UrlEncodingStyle};
use std::sync::Arc;
use url::Url;

/// 中继提供者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayProvider {
    pub name: String,
    pub base_url: String,
    pub url_encoding: UrlEncodingStyle,
    pub envelope: ResponseEnvelope,
}

impl RelayProvider {
    /// 按编码方式拼接中继地址
    #[must_use]
    pub fn relay_url(&self, target: &Url) -> String {
        match self.url_encoding {
            UrlEncodingStyle::QueryParamEncoded => {
                format!("{}{}", self.base_url, urlencoding::encode(target.as_str()))
            }
            UrlEncodingStyle::PathAppended => format!("{}{}", self.base_url, target.as_str()),
        }
    }
}

impl From<&RelayProviderConfig> for RelayProvider {
    fn from(config: &RelayProviderConfig) -> Self {
        Self {
            name: config.name.clone(),
            base_url: config.base_url.clone(),
            url_encoding: config.url_encoding,
            envelope: config.envelope,
        }
    }
}

/// 回退链中的一步
#[derive(Debug, Clone, Copy)]
pub enum ChainStep<'a> {
    Direct,
    Relay {
        index: usize,
        provider: &'a RelayProvider,
    },
}

impl ChainStep<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Direct => "direct",
            Self::Relay { provider, .. } => &provider.name,
        }
    }

    /// 本步骤实际请求的地址
    #[must_use]
    pub fn outbound_url(&self, target: &Url) -> String {
        match self {
            Self::Direct => target.as_str().to_string(),
            Self::Relay { provider, .. } => provider.relay_url(target),
        }
    }

    /// 本步骤响应的包装方式（直连总是原样）
    #[must_use]
    pub const fn envelope(&self) -> ResponseEnvelope {
        match self {
            Self::Direct => ResponseEnvelope::Raw,
            Self::Relay { provider, .. } => provider.envelope,
        }
    }

    #[must_use]
    pub fn source(&self) -> AttemptSource {
        match self {
            Self::Direct => AttemptSource::Direct,
            Self::Relay { index, provider } => AttemptSource::Relay {
                index: *index,
                name: provider.name.clone(),
            },
        }
    }
}

/// 不可变的中继回退链
#[derive(Debug, Clone, Default)]
pub struct RelayChain {
    relays: Arc<[RelayProvider]>,
}

impl RelayChain {
    #[must_use]
    pub fn new(relays: Vec<RelayProvider>) -> Self {
        Self {
            relays: relays.into(),
        }
    }

    #[must_use]
    pub fn from_config(configs: &[RelayProviderConfig]) -> Self {
        Self::new(configs.iter().map(RelayProvider::from).collect())
    }

    #[must_use]
    pub fn relays(&self) -> &[RelayProvider] {
        &self.relays
    }

    /// 总尝试次数上限（直连 + 中继）
    #[must_use]
    pub fn len(&self) -> usize {
        self.relays.len() + 1
    }

    /// 链永远包含直连这一步
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// 按顺序遍历链中的每一步
    pub fn steps(&self) -> impl Iterator<Item = ChainStep<'_>> {
        std::iter::once(ChainStep::Direct).chain(
            self.relays
                .iter()
                .enumerate()
                .map(|(index, provider)| ChainStep::Relay { index, provider }),
        )
    }

    /// 所有步骤名称，供健康检查与启动日志使用
    #[must_use]
    pub fn step_names(&self) -> Vec<String> {
        self.steps().map(|step| step.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn provider(name: &str, base_url: &str, url_encoding: UrlEncodingStyle) -> RelayProvider {
        RelayProvider {
            name: name.to_string(),
            base_url: base_url.to_string(),
            url_encoding,
            envelope: ResponseEnvelope::Raw,
        }
    }

    #[test]
    fn test_query_param_encoded_relay_url() {
        let relay = provider(
            "allorigins",
            "https://api.allorigins.win/get?url=",
            UrlEncodingStyle::QueryParamEncoded,
        );
        let target = Url::parse("https://script.google.com/macros/s/abc/exec?id=3").unwrap();

        assert_eq!(
            relay.relay_url(&target),
            "https://api.allorigins.win/get?url=https%3A%2F%2Fscript.google.com%2Fmacros%2Fs%2Fabc%2Fexec%3Fid%3D3"
        );
    }

    #[test]
    fn test_path_appended_relay_url() {
        let relay = provider(
            "thingproxy",
            "https://thingproxy.freeboard.io/fetch/",
            UrlEncodingStyle::PathAppended,
        );
        let target = Url::parse("https://httpbin.org/get?a=1").unwrap();

        assert_eq!(
            relay.relay_url(&target),
            "https://thingproxy.freeboard.io/fetch/https://httpbin.org/get?a=1"
        );
    }

    #[test]
    fn test_chain_starts_with_direct_and_keeps_order() {
        let chain = RelayChain::new(vec![
            provider("bridged", "https://cors.bridged.cc/", UrlEncodingStyle::PathAppended),
            provider(
                "allorigins",
                "https://api.allorigins.win/get?url=",
                UrlEncodingStyle::QueryParamEncoded,
            ),
        ]);

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.step_names(), vec!["direct", "bridged", "allorigins"]);

        let sources: Vec<AttemptSource> = chain.steps().map(|step| step.source()).collect();
        assert_eq!(sources[0], AttemptSource::Direct);
        assert_eq!(
            sources[2],
            AttemptSource::Relay {
                index: 1,
                name: "allorigins".to_string()
            }
        );
    }

    #[test]
    fn test_direct_step_uses_target_and_raw_envelope() {
        let chain = RelayChain::default();
        let target = Url::parse("https://example.com/api").unwrap();
        let step = chain.steps().next().unwrap();

        assert_eq!(chain.len(), 1);
        assert_eq!(step.outbound_url(&target), "https://example.com/api");
        assert_eq!(step.envelope(), ResponseEnvelope::Raw);
    }
}
