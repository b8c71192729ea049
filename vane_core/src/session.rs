//! 会话与服务句柄
//!
//! 会话和服务由传输层拥有，分发核心只持有只读句柄，用于身份识别。

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// 会话唯一标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// 创建新的会话 ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// 获取内部值
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 会话 ID 生成器
#[derive(Debug)]
pub struct SessionIdGenerator {
    next_id: AtomicU64,
}

impl SessionIdGenerator {
    /// 创建新的生成器，从 1 开始
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// 生成下一个 ID
    pub fn next(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct SessionInner {
    id: SessionId,
    remote_addr: Option<SocketAddr>,
    created_at: Instant,
}

/// 会话句柄
///
/// 克隆代价很低，相等性和哈希只看会话 ID。
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// 创建没有远程地址的会话（测试或非套接字传输）
    pub fn new(id: SessionId) -> Self {
        Self::build(id, None)
    }

    /// 创建带远程地址的会话
    pub fn with_remote(id: SessionId, remote_addr: SocketAddr) -> Self {
        Self::build(id, Some(remote_addr))
    }

    fn build(id: SessionId, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                remote_addr,
                created_at: Instant::now(),
            }),
        }
    }

    /// 会话 ID
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// 远程地址
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.inner.remote_addr
    }

    /// 会话存活时间
    pub fn age(&self) -> std::time::Duration {
        self.inner.created_at.elapsed()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Session {}

impl std::hash::Hash for Session {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.remote_addr {
            Some(addr) => write!(f, "session#{}({})", self.inner.id, addr),
            None => write!(f, "session#{}", self.inner.id),
        }
    }
}

/// 服务唯一标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(u64);

impl ServiceId {
    /// 创建新的服务 ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// 获取内部值
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 服务句柄（监听端，拥有多个会话）
#[derive(Debug, Clone)]
pub struct Service {
    id: ServiceId,
    name: Arc<str>,
}

impl Service {
    /// 创建服务句柄
    pub fn new(id: ServiceId, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// 服务 ID
    pub fn id(&self) -> ServiceId {
        self.id
    }

    /// 服务名称
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Service {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id() {
        let id1 = SessionId::new(1);
        let id2 = SessionId::new(2);
        assert_ne!(id1, id2);
        assert_eq!(id1.value(), 1);
    }

    #[test]
    fn test_id_generator() {
        let generator = SessionIdGenerator::new();
        assert_eq!(generator.next().value(), 1);
        assert_eq!(generator.next().value(), 2);
    }

    #[test]
    fn test_session_equality_by_id() {
        let addr = "127.0.0.1:8080".parse().unwrap();
        let a = Session::with_remote(SessionId::new(5), addr);
        let b = Session::new(SessionId::new(5));
        assert_eq!(a, b);
        assert_eq!(a.clone().remote_addr(), Some(addr));
        assert_eq!(b.remote_addr(), None);
    }

    #[test]
    fn test_session_display() {
        let addr = "10.0.0.1:9000".parse().unwrap();
        assert_eq!(Session::new(SessionId::new(3)).to_string(), "session#3");
        assert_eq!(
            Session::with_remote(SessionId::new(4), addr).to_string(),
            "session#4(10.0.0.1:9000)"
        );
    }

    #[test]
    fn test_service_handle() {
        let service = Service::new(ServiceId::new(1), "echo");
        assert_eq!(service.name(), "echo");
        assert_eq!(service, Service::new(ServiceId::new(1), "other"));
    }
}
