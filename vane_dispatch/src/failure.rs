//! 进程级未捕获失败通道
//!
//! `exception_caught` 自身失败，或服务事件的回调失败时，已经没有可以通知的
//! 处理器，失败会被上报到这里。

use std::fmt;
use std::sync::Arc;
use vane_config::UncaughtPolicy;
use vane_core::{Cause, EventKind, SessionId};

/// 未捕获的失败
#[derive(Debug, Clone)]
pub struct UncaughtFailure {
    /// 失败时正在投递的事件类型
    pub kind: EventKind,
    /// 所属会话
    pub session: Option<SessionId>,
    /// 原始错误
    pub cause: Cause,
}

impl fmt::Display for UncaughtFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.session {
            Some(id) => write!(f, "{} (session {}): {}", self.kind, id, self.cause),
            None => write!(f, "{}: {}", self.kind, self.cause),
        }
    }
}

/// 未捕获失败接收端
pub trait FailureSink: Send + Sync {
    fn report(&self, failure: UncaughtFailure);
}

impl<F> FailureSink for F
where
    F: Fn(UncaughtFailure) + Send + Sync,
{
    fn report(&self, failure: UncaughtFailure) {
        self(failure)
    }
}

/// 记录 error 日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFailureSink;

impl FailureSink for LogFailureSink {
    fn report(&self, failure: UncaughtFailure) {
        tracing::error!(
            event = %failure.kind,
            session = ?failure.session.map(|id| id.value()),
            error = %failure.cause,
            "未捕获的处理器失败"
        );
    }
}

/// 记录日志后终止进程
#[derive(Debug, Default, Clone, Copy)]
pub struct AbortFailureSink;

impl FailureSink for AbortFailureSink {
    fn report(&self, failure: UncaughtFailure) {
        LogFailureSink.report(failure);
        std::process::abort();
    }
}

/// 根据配置选择接收端
pub fn sink_for(policy: UncaughtPolicy) -> Arc<dyn FailureSink> {
    match policy {
        UncaughtPolicy::Log => Arc::new(LogFailureSink),
        UncaughtPolicy::Abort => Arc::new(AbortFailureSink),
    }
}
