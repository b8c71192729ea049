//! 分发指标
//!
//! 收集和统计事件分发相关的计数。

use std::sync::atomic::{AtomicU64, Ordering};

/// 分发指标
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// 被接受的事件数
    submitted: AtomicU64,
    /// 被拒绝的事件数
    rejected: AtomicU64,
    /// 已投递（回调已返回）的事件数
    delivered: AtomicU64,
    /// 转换为 exception_caught 的回调失败数
    handler_failures: AtomicU64,
    /// 上报到未捕获通道的失败数
    uncaught_failures: AtomicU64,
    /// 因关闭而取消的事件数
    cancelled: AtomicU64,
}

impl DispatchMetrics {
    /// 创建新的分发指标
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_uncaught_failure(&self) {
        self.uncaught_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self, count: u64) {
        self.cancelled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }

    pub fn uncaught_failures(&self) -> u64 {
        self.uncaught_failures.load(Ordering::Relaxed)
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// 已接受但尚未投递或取消的事件数
    pub fn in_flight(&self) -> u64 {
        self.submitted()
            .saturating_sub(self.delivered())
            .saturating_sub(self.cancelled())
    }

    /// 生成摘要
    pub fn summary(&self) -> String {
        format!(
            "分发指标: 提交={}, 拒绝={}, 投递={}, 回调失败={}, 未捕获={}, 取消={}",
            self.submitted(),
            self.rejected(),
            self.delivered(),
            self.handler_failures(),
            self.uncaught_failures(),
            self.cancelled()
        )
    }
}
