//! # 转发与回退
//!
//! 按 直连 -> 中继1 -> 中继2 ... 的顺序依次尝试，第一个拿到 HTTP 响应的尝试胜出。
//! 上游返回的 4xx/5xx 也算成功，只有传输层失败（超时、连接、读取）才会切换到下一步。
//! 尝试严格串行，同一时刻最多一个出站请求。

use crate::error::prelude::*;
use crate::logging::{LogComponent, LogStage};
use crate::proxy::provider::RelayChain;
use crate::proxy::response_unwrapper;
use crate::proxy::types::{ForwardRequest, ForwardResult, OutboundRequest, duration_millis};
use crate::proxy::upstream::HttpTransport;
use crate::types::TimeoutMillis;
use crate::{ldebug, lerror, linfo, lwarn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 请求转发器
#[derive(Clone)]
pub struct RequestForwarder {
    transport: Arc<dyn HttpTransport>,
    chain: RelayChain,
    total_deadline: Option<TimeoutMillis>,
}

impl RequestForwarder {
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        chain: RelayChain,
        total_deadline: Option<TimeoutMillis>,
    ) -> Self {
        Self {
            transport,
            chain,
            total_deadline,
        }
    }

    #[must_use]
    pub const fn chain(&self) -> &RelayChain {
        &self.chain
    }

    /// 沿回退链转发请求
    ///
    /// `cancel` 触发时立即放弃当前尝试且不再发起后续尝试。
    pub async fn forward(
        &self,
        request: &ForwardRequest,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ForwardResult> {
        let started = Instant::now();
        let deadline = self
            .total_deadline
            .map(|total| started + total.as_duration());
        let mut failures: Vec<AttemptFailure> = Vec::with_capacity(self.chain.len());

        for (position, step) in self.chain.steps().enumerate() {
            let attempt = position + 1;
            let provider = step.name().to_string();

            let Some(budget) = attempt_budget(request.timeout.as_duration(), deadline) else {
                lwarn!(
                    request_id,
                    LogStage::Fallback,
                    LogComponent::Forwarder,
                    "deadline_exceeded",
                    "total deadline reached before attempt could start",
                    attempt = attempt,
                    provider = %provider
                );
                failures.push(AttemptFailure {
                    attempt,
                    provider,
                    error: TransportError::Timeout { timeout_ms: 0 },
                    elapsed_ms: 0,
                });
                break;
            };

            let outbound = OutboundRequest {
                url: step.outbound_url(&request.target_url),
                method: request.method,
                headers: request.headers.clone(),
                body: request.body.clone(),
                timeout: budget,
            };

            ldebug!(
                request_id,
                LogStage::Forward,
                LogComponent::Forwarder,
                "attempt_start",
                "forwarding attempt started",
                attempt = attempt,
                provider = %provider,
                url = %outbound.url,
                method = %request.method,
                budget_ms = duration_millis(budget)
            );

            let attempt_started = Instant::now();
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    linfo!(
                        request_id,
                        LogStage::Forward,
                        LogComponent::Forwarder,
                        "attempt_cancelled",
                        "forwarding cancelled, no further attempts",
                        attempt = attempt,
                        provider = %provider
                    );
                    return Err(ProxyError::cancelled(format!(
                        "request cancelled during attempt {attempt} ({provider})"
                    )));
                }
                result = tokio::time::timeout(budget, self.transport.execute(outbound)) => {
                    result.unwrap_or_else(|_| Err(TransportError::Timeout {
                        timeout_ms: duration_millis(budget),
                    }))
                }
            };
            let elapsed_ms = duration_millis(attempt_started.elapsed());

            match outcome {
                Ok(response) => {
                    linfo!(
                        request_id,
                        LogStage::Forward,
                        LogComponent::Forwarder,
                        "attempt_succeeded",
                        "forwarding attempt produced a response",
                        attempt = attempt,
                        provider = %provider,
                        status_code = response.status.as_u16(),
                        elapsed_ms = elapsed_ms,
                        outcome = "success"
                    );

                    let envelope = step.envelope();
                    let parsed_body = response_unwrapper::unwrap_payload(&response.body, envelope);
                    ldebug!(
                        request_id,
                        LogStage::Unwrap,
                        LogComponent::Unwrapper,
                        "payload_unwrapped",
                        "response payload normalized",
                        provider = %provider,
                        envelope = envelope.as_str(),
                        payload = parsed_body.kind(),
                        body_bytes = response.body.len()
                    );
                    return Ok(ForwardResult {
                        status: response.status,
                        raw_body: response.body,
                        parsed_body,
                        content_type: response.content_type,
                        envelope,
                        succeeded_via: step.source(),
                        attempts: attempt,
                        elapsed: started.elapsed(),
                    });
                }
                Err(error) => {
                    lwarn!(
                        request_id,
                        LogStage::Fallback,
                        LogComponent::Forwarder,
                        "attempt_failed",
                        "forwarding attempt failed, moving to next provider",
                        attempt = attempt,
                        provider = %provider,
                        error_code = error.code(),
                        error = %error,
                        elapsed_ms = elapsed_ms,
                        outcome = "failure"
                    );
                    failures.push(AttemptFailure {
                        attempt,
                        provider,
                        error,
                        elapsed_ms,
                    });
                }
            }
        }

        lerror!(
            request_id,
            LogStage::ResponseFailure,
            LogComponent::Forwarder,
            "chain_exhausted",
            "all forwarding attempts failed",
            attempts = failures.len(),
            elapsed_ms = duration_millis(started.elapsed())
        );
        Err(ProxyError::all_providers_exhausted(failures))
    }
}

/// 本次尝试可用的时间：单次超时与剩余总时限取较小值，总时限耗尽时为 `None`
fn attempt_budget(per_attempt: Duration, deadline: Option<Instant>) -> Option<Duration> {
    match deadline {
        None => Some(per_attempt),
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            (!remaining.is_zero()).then(|| remaining.min(per_attempt))
        }
    }
}
