//! 连接计数
//!
//! 限制同时打开的会话数，并统计传输层事件的处理结果。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// 传输层指标
#[derive(Debug, Default)]
pub struct TransportMetrics {
    /// 当前连接数
    current_connections: AtomicUsize,
    /// 总连接数（累计）
    total_connections: AtomicU64,
    /// 因超过连接上限而被关闭的连接数
    refused_connections: AtomicU64,
    /// 被拒绝后丢弃的事件数
    dropped_events: AtomicU64,
    /// 节流重试次数
    throttle_retries: AtomicU64,
    /// 因事件被拒绝而主动关闭的会话数
    escalated_sessions: AtomicU64,
}

impl TransportMetrics {
    /// 创建新的传输层指标
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_connections(&self) -> usize {
        self.current_connections.load(Ordering::Relaxed)
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    pub fn refused_connections(&self) -> u64 {
        self.refused_connections.load(Ordering::Relaxed)
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    pub fn throttle_retries(&self) -> u64 {
        self.throttle_retries.load(Ordering::Relaxed)
    }

    pub fn escalated_sessions(&self) -> u64 {
        self.escalated_sessions.load(Ordering::Relaxed)
    }

    pub(crate) fn record_refused(&self) {
        self.refused_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttle_retry(&self) {
        self.throttle_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_escalated(&self) {
        self.escalated_sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// 生成摘要
    pub fn summary(&self) -> String {
        format!(
            "传输指标: 当前连接={}, 累计连接={}, 拒绝连接={}, 丢弃事件={}, 节流重试={}, 升级关闭={}",
            self.current_connections(),
            self.total_connections(),
            self.refused_connections(),
            self.dropped_events(),
            self.throttle_retries(),
            self.escalated_sessions()
        )
    }
}

/// 占用一个连接名额，释放时归还
#[derive(Debug)]
pub(crate) struct ConnectionGuard {
    metrics: Arc<TransportMetrics>,
}

impl ConnectionGuard {
    /// 尝试占用名额，已达上限返回 `None`
    pub(crate) fn acquire(metrics: &Arc<TransportMetrics>, limit: Option<usize>) -> Option<Self> {
        let admitted = metrics
            .current_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match limit {
                Some(max) if current >= max => None,
                _ => Some(current + 1),
            })
            .is_ok();

        if !admitted {
            metrics.record_refused();
            return None;
        }

        metrics.total_connections.fetch_add(1, Ordering::Relaxed);
        Some(Self {
            metrics: Arc::clone(metrics),
        })
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.metrics
            .current_connections
            .fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = TransportMetrics::new();
        assert_eq!(metrics.current_connections(), 0);
        assert_eq!(metrics.total_connections(), 0);
    }

    #[test]
    fn test_guard_enforces_limit() {
        let metrics = Arc::new(TransportMetrics::new());

        let first = ConnectionGuard::acquire(&metrics, Some(2)).unwrap();
        let _second = ConnectionGuard::acquire(&metrics, Some(2)).unwrap();
        assert!(ConnectionGuard::acquire(&metrics, Some(2)).is_none());
        assert_eq!(metrics.current_connections(), 2);
        assert_eq!(metrics.refused_connections(), 1);

        drop(first);
        assert_eq!(metrics.current_connections(), 1);
        assert!(ConnectionGuard::acquire(&metrics, Some(2)).is_some());
        assert_eq!(metrics.total_connections(), 3);
    }

    #[test]
    fn test_unlimited() {
        let metrics = Arc::new(TransportMetrics::new());
        let guards: Vec<_> = (0..100)
            .map(|_| ConnectionGuard::acquire(&metrics, None).unwrap())
            .collect();
        assert_eq!(metrics.current_connections(), 100);
        drop(guards);
        assert_eq!(metrics.current_connections(), 0);
    }

    #[test]
    fn test_summary() {
        let metrics = TransportMetrics::new();
        metrics.record_dropped();
        assert!(metrics.summary().contains("丢弃事件=1"));
    }
}
