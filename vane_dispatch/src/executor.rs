//! 处理器执行器抽象

use crate::error::DispatchRejected;
use crate::metrics::DispatchMetrics;
use std::sync::Arc;
use std::time::Duration;
use vane_config::Strategy;
use vane_core::{Event, IoHandler};

/// 关闭结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// 已接受但尚未开始投递、因关闭而取消的事件数
    pub cancelled: u64,
    /// 等待期结束时仍在执行回调、被放弃的线程数
    pub abandoned_workers: usize,
}

/// 处理器执行器
///
/// 决定事件在哪个线程、以什么顺序投递到处理器。调用方通常是传输层的
/// 检测线程，`submit` 从不等待回调执行。
pub trait HandlerExecutor: Send + Sync {
    /// 提交事件，立即返回
    ///
    /// 无法接受时返回 [`DispatchRejected`]，事件随错误交还调用方。
    fn submit(&self, event: Event, handler: Arc<dyn IoHandler>) -> Result<(), DispatchRejected>;

    /// 当前策略
    fn strategy(&self) -> Strategy;

    /// 分发指标
    fn metrics(&self) -> &DispatchMetrics;

    /// 关闭执行器
    ///
    /// 取消尚未开始的事件，执行中的回调最多等待 `grace`（`None` 表示一直等待）。
    /// 重复调用返回空结果。
    fn shutdown(&self, grace: Option<Duration>) -> ShutdownReport;

    /// 是否已关闭
    fn is_shutdown(&self) -> bool;
}
