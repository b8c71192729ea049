//! 分发错误类型

use std::fmt;
use thiserror::Error;
use vane_core::{Event, VaneError};

/// 提交被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// 有界队列已满
    Saturated,
    /// 执行器已关闭或正在关闭
    Shutdown,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RejectReason::Saturated => "队列已满",
            RejectReason::Shutdown => "已关闭",
        })
    }
}

/// 提交被拒绝
///
/// 被拒绝的事件原样交还给调用方，由调用方决定丢弃、节流或升级处理。
#[derive(Error, Debug)]
#[error("分发被拒绝 ({reason}): {}", .event.kind())]
pub struct DispatchRejected {
    /// 拒绝原因
    pub reason: RejectReason,
    /// 未被接受的事件
    pub event: Event,
}

impl DispatchRejected {
    pub fn new(reason: RejectReason, event: Event) -> Self {
        Self { reason, event }
    }

    /// 取回事件
    pub fn into_event(self) -> Event {
        self.event
    }
}

impl From<DispatchRejected> for VaneError {
    fn from(err: DispatchRejected) -> Self {
        let session = err.event.session().map(|s| s.id());
        let base = VaneError::dispatch(err.to_string());
        match session {
            Some(id) => base.with_context(id),
            None => base,
        }
    }
}

/// 线程池拒绝执行任务，任务原样交还
pub struct PoolRejected<T> {
    pub reason: RejectReason,
    pub task: T,
}

impl<T> PoolRejected<T> {
    pub fn into_task(self) -> T {
        self.task
    }
}

impl<T> fmt::Debug for PoolRejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRejected")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}
