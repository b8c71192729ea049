//! 连接事件模型
//!
//! 事件由传输层构造，构造后不可变。每个变体对应 [`IoHandler`](crate::IoHandler)
//! 上唯一的一个方法，并携带重建该调用所需的全部参数。

use crate::session::{Service, ServiceId, Session, SessionId};
use bytes::Bytes;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 捕获到的失败
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// 空闲状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdleStatus {
    /// 读方向空闲
    ReaderIdle,
    /// 写方向空闲
    WriterIdle,
    /// 读写均空闲
    BothIdle,
}

impl fmt::Display for IdleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdleStatus::ReaderIdle => "reader_idle",
            IdleStatus::WriterIdle => "writer_idle",
            IdleStatus::BothIdle => "both_idle",
        })
    }
}

/// 解码后的消息值
///
/// 类型擦除的共享值。分发层不解释消息内容，只原样传递。
#[derive(Clone)]
pub struct Message(Arc<dyn Any + Send + Sync>);

impl Message {
    /// 包装任意值
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// 按具体类型借用
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// 是否为指定类型
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    /// 两个消息是否指向同一个值
    pub fn ptr_eq(&self, other: &Message) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.downcast_ref::<String>() {
            f.debug_tuple("Message").field(s).finish()
        } else if let Some(s) = self.downcast_ref::<&'static str>() {
            f.debug_tuple("Message").field(s).finish()
        } else if let Some(b) = self.downcast_ref::<Bytes>() {
            f.debug_tuple("Message").field(b).finish()
        } else {
            f.write_str("Message(..)")
        }
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::new(value)
    }
}

impl From<&'static str> for Message {
    fn from(value: &'static str) -> Self {
        Message::new(value)
    }
}

impl From<Bytes> for Message {
    fn from(value: Bytes) -> Self {
        Message::new(value)
    }
}

/// 事件类型（不带负载）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SessionOpened,
    SessionClosed,
    SessionIdle,
    MessageReceived,
    MessageSent,
    ServiceActivated,
    ServiceInactivated,
    ExceptionCaught,
    HandshakeStarted,
    HandshakeCompleted,
    SecureClosed,
}

impl EventKind {
    /// 所有事件类型
    pub const ALL: [EventKind; 11] = [
        EventKind::SessionOpened,
        EventKind::SessionClosed,
        EventKind::SessionIdle,
        EventKind::MessageReceived,
        EventKind::MessageSent,
        EventKind::ServiceActivated,
        EventKind::ServiceInactivated,
        EventKind::ExceptionCaught,
        EventKind::HandshakeStarted,
        EventKind::HandshakeCompleted,
        EventKind::SecureClosed,
    ];

    /// 蛇形命名，用于日志
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SessionOpened => "session_opened",
            EventKind::SessionClosed => "session_closed",
            EventKind::SessionIdle => "session_idle",
            EventKind::MessageReceived => "message_received",
            EventKind::MessageSent => "message_sent",
            EventKind::ServiceActivated => "service_activated",
            EventKind::ServiceInactivated => "service_inactivated",
            EventKind::ExceptionCaught => "exception_caught",
            EventKind::HandshakeStarted => "handshake_started",
            EventKind::HandshakeCompleted => "handshake_completed",
            EventKind::SecureClosed => "secure_closed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 有序分发的排队键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderingKey {
    /// 会话事件
    Session(SessionId),
    /// 服务事件
    Service(ServiceId),
}

/// 连接事件
#[derive(Debug, Clone)]
pub enum Event {
    /// 会话已打开
    SessionOpened { session: Session },
    /// 会话已关闭
    SessionClosed { session: Session },
    /// 会话空闲
    SessionIdle { session: Session, status: IdleStatus },
    /// 收到消息
    MessageReceived { session: Session, message: Message },
    /// 消息已写出
    MessageSent { session: Session, message: Message },
    /// 服务已激活
    ServiceActivated { service: Service },
    /// 服务已停止
    ServiceInactivated { service: Service },
    /// 会话上捕获到失败
    ExceptionCaught { session: Session, cause: Cause },
    /// 安全握手开始
    HandshakeStarted { session: Session },
    /// 安全握手完成
    HandshakeCompleted { session: Session },
    /// 安全层已关闭
    SecureClosed { session: Session },
}

impl Event {
    pub fn session_opened(session: Session) -> Self {
        Event::SessionOpened { session }
    }

    pub fn session_closed(session: Session) -> Self {
        Event::SessionClosed { session }
    }

    pub fn session_idle(session: Session, status: IdleStatus) -> Self {
        Event::SessionIdle { session, status }
    }

    pub fn message_received(session: Session, message: impl Into<Message>) -> Self {
        Event::MessageReceived {
            session,
            message: message.into(),
        }
    }

    pub fn message_sent(session: Session, message: impl Into<Message>) -> Self {
        Event::MessageSent {
            session,
            message: message.into(),
        }
    }

    pub fn service_activated(service: Service) -> Self {
        Event::ServiceActivated { service }
    }

    pub fn service_inactivated(service: Service) -> Self {
        Event::ServiceInactivated { service }
    }

    /// 以任意错误构造 `ExceptionCaught`
    pub fn exception_caught<E>(session: Session, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Event::ExceptionCaught {
            session,
            cause: Arc::new(cause),
        }
    }

    /// 以已捕获的失败构造 `ExceptionCaught`
    pub fn exception_caught_with(session: Session, cause: Cause) -> Self {
        Event::ExceptionCaught { session, cause }
    }

    pub fn handshake_started(session: Session) -> Self {
        Event::HandshakeStarted { session }
    }

    pub fn handshake_completed(session: Session) -> Self {
        Event::HandshakeCompleted { session }
    }

    pub fn secure_closed(session: Session) -> Self {
        Event::SecureClosed { session }
    }

    /// 事件类型
    pub fn kind(&self) -> EventKind {
        match self {
            Event::SessionOpened { .. } => EventKind::SessionOpened,
            Event::SessionClosed { .. } => EventKind::SessionClosed,
            Event::SessionIdle { .. } => EventKind::SessionIdle,
            Event::MessageReceived { .. } => EventKind::MessageReceived,
            Event::MessageSent { .. } => EventKind::MessageSent,
            Event::ServiceActivated { .. } => EventKind::ServiceActivated,
            Event::ServiceInactivated { .. } => EventKind::ServiceInactivated,
            Event::ExceptionCaught { .. } => EventKind::ExceptionCaught,
            Event::HandshakeStarted { .. } => EventKind::HandshakeStarted,
            Event::HandshakeCompleted { .. } => EventKind::HandshakeCompleted,
            Event::SecureClosed { .. } => EventKind::SecureClosed,
        }
    }

    /// 所属会话，服务事件返回 `None`
    pub fn session(&self) -> Option<&Session> {
        match self {
            Event::SessionOpened { session }
            | Event::SessionClosed { session }
            | Event::SessionIdle { session, .. }
            | Event::MessageReceived { session, .. }
            | Event::MessageSent { session, .. }
            | Event::ExceptionCaught { session, .. }
            | Event::HandshakeStarted { session }
            | Event::HandshakeCompleted { session }
            | Event::SecureClosed { session } => Some(session),
            Event::ServiceActivated { .. } | Event::ServiceInactivated { .. } => None,
        }
    }

    /// 有序分发时使用的排队键
    pub fn ordering_key(&self) -> OrderingKey {
        match self {
            Event::ServiceActivated { service } | Event::ServiceInactivated { service } => {
                OrderingKey::Service(service.id())
            }
            Event::SessionOpened { session }
            | Event::SessionClosed { session }
            | Event::SessionIdle { session, .. }
            | Event::MessageReceived { session, .. }
            | Event::MessageSent { session, .. }
            | Event::ExceptionCaught { session, .. }
            | Event::HandshakeStarted { session }
            | Event::HandshakeCompleted { session }
            | Event::SecureClosed { session } => OrderingKey::Session(session.id()),
        }
    }

    /// 是否为会话的终止事件
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::SessionClosed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaneError;

    fn session(id: u64) -> Session {
        Session::new(SessionId::new(id))
    }

    #[test]
    fn test_kind_matches_constructor() {
        let s = session(1);
        let service = Service::new(ServiceId::new(1), "svc");
        let events = [
            Event::session_opened(s.clone()),
            Event::session_closed(s.clone()),
            Event::session_idle(s.clone(), IdleStatus::BothIdle),
            Event::message_received(s.clone(), "ping"),
            Event::message_sent(s.clone(), "pong"),
            Event::service_activated(service.clone()),
            Event::service_inactivated(service),
            Event::exception_caught(s.clone(), VaneError::timeout()),
            Event::handshake_started(s.clone()),
            Event::handshake_completed(s.clone()),
            Event::secure_closed(s),
        ];

        let kinds: Vec<EventKind> = events.iter().map(Event::kind).collect();
        assert_eq!(kinds, EventKind::ALL.to_vec());
    }

    #[test]
    fn test_ordering_key() {
        let event = Event::message_received(session(9), "x");
        assert_eq!(event.ordering_key(), OrderingKey::Session(SessionId::new(9)));

        let event = Event::service_activated(Service::new(ServiceId::new(2), "svc"));
        assert_eq!(event.ordering_key(), OrderingKey::Service(ServiceId::new(2)));
        assert!(event.session().is_none());
    }

    #[test]
    fn test_clone_shares_message() {
        let event = Event::message_received(session(1), String::from("hello"));
        let copy = event.clone();
        match (&event, &copy) {
            (
                Event::MessageReceived { message: a, .. },
                Event::MessageReceived { message: b, .. },
            ) => {
                assert!(a.ptr_eq(b));
                assert_eq!(b.downcast_ref::<String>().map(String::as_str), Some("hello"));
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_message_debug() {
        assert_eq!(format!("{:?}", Message::from("ping")), "Message(\"ping\")");
        assert_eq!(format!("{:?}", Message::new(7u32)), "Message(..)");
    }

    #[test]
    fn test_is_terminal() {
        assert!(Event::session_closed(session(1)).is_terminal());
        assert!(!Event::session_opened(session(1)).is_terminal());
    }
}
