//! 按拒绝策略提交事件
//!
//! 执行器拒绝事件时由传输层决定后续处理：丢弃、节流重试或关闭会话。
//! 节流期间读取任务在此等待，相当于暂停读取该会话。

use crate::connection::TransportMetrics;
use std::sync::Arc;
use std::time::Duration;
use vane_config::{RejectionPolicy, TransportConfig};
use vane_core::{Event, IoHandler};
use vane_dispatch::{DispatchRejected, HandlerExecutor, RejectReason};

/// 提交结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// 执行器已接受
    Accepted,
    /// 事件被丢弃
    Dropped,
    /// 需要关闭会话
    Escalated,
}

/// 事件提交器
#[derive(Clone)]
pub(crate) struct Submitter {
    executor: Arc<dyn HandlerExecutor>,
    handler: Arc<dyn IoHandler>,
    metrics: Arc<TransportMetrics>,
    policy: RejectionPolicy,
    backoff: Duration,
    retries: u32,
}

impl Submitter {
    pub(crate) fn new(
        config: &TransportConfig,
        executor: Arc<dyn HandlerExecutor>,
        handler: Arc<dyn IoHandler>,
        metrics: Arc<TransportMetrics>,
    ) -> Self {
        Self {
            executor,
            handler,
            metrics,
            policy: config.rejection_policy,
            backoff: Duration::from_millis(config.throttle_backoff_ms),
            retries: config.throttle_retries,
        }
    }

    pub(crate) async fn submit(&self, event: Event) -> Outcome {
        let mut event = event;
        let mut attempt = 0;

        loop {
            let rejected = match self.executor.submit(event, Arc::clone(&self.handler)) {
                Ok(()) => return Outcome::Accepted,
                Err(rejected) => rejected,
            };

            // 执行器已关闭，重试没有意义
            if rejected.reason == RejectReason::Shutdown {
                return self.drop_event(rejected);
            }

            match self.policy {
                RejectionPolicy::Drop => return self.drop_event(rejected),
                RejectionPolicy::Throttle if attempt < self.retries => {
                    attempt += 1;
                    self.metrics.record_throttle_retry();
                    tracing::debug!(
                        event = %rejected.event.kind(),
                        attempt,
                        backoff_ms = self.backoff.as_millis() as u64,
                        "执行器饱和，节流后重试"
                    );
                    tokio::time::sleep(self.backoff).await;
                    event = rejected.into_event();
                }
                RejectionPolicy::Throttle => return self.drop_event(rejected),
                RejectionPolicy::Escalate => {
                    // 终止事件和服务事件无法再升级
                    if rejected.event.is_terminal() || rejected.event.session().is_none() {
                        return self.drop_event(rejected);
                    }
                    self.metrics.record_escalated();
                    tracing::warn!(
                        event = %rejected.event.kind(),
                        session = ?rejected.event.session().map(|s| s.id().value()),
                        "执行器饱和，关闭会话"
                    );
                    return Outcome::Escalated;
                }
            }
        }
    }

    fn drop_event(&self, rejected: DispatchRejected) -> Outcome {
        self.metrics.record_dropped();
        tracing::warn!(
            event = %rejected.event.kind(),
            session = ?rejected.event.session().map(|s| s.id().value()),
            reason = %rejected.reason,
            "事件被拒绝，已丢弃"
        );
        Outcome::Dropped
    }
}
