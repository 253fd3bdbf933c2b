use crate::config::GatewaySettings;
use crate::proxy::forwarding::RequestForwarder;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 网关处理器的共享状态
///
/// 启动时构建，运行期只读；`shutdown` 用于在关闭宽限期结束后取消仍在进行的转发。
#[derive(Clone)]
pub struct GatewayState {
    settings: Arc<GatewaySettings>,
    forwarder: Arc<RequestForwarder>,
    max_body_bytes: usize,
    shutdown: CancellationToken,
}

impl GatewayState {
    #[must_use]
    pub fn new(
        settings: GatewaySettings,
        forwarder: RequestForwarder,
        max_body_bytes: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            forwarder: Arc::new(forwarder),
            max_body_bytes,
            shutdown,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    #[must_use]
    pub fn forwarder(&self) -> &RequestForwarder {
        &self.forwarder
    }

    #[must_use]
    pub const fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    #[must_use]
    pub const fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}
