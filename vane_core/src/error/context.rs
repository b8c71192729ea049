//! 错误上下文
//!
//! 为错误附加会话、事件类型等定位信息。

use crate::event::EventKind;
use crate::session::SessionId;
use std::fmt;

/// 错误上下文信息
#[derive(Debug, Clone)]
pub enum ErrorContext {
    /// 所属会话
    Session(SessionId),
    /// 正在投递的事件类型
    Event(EventKind),
    /// 键值对上下文
    KeyValue(String, String),
    /// 自定义上下文
    Custom(String),
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorContext::Session(id) => write!(f, "session: {}", id),
            ErrorContext::Event(kind) => write!(f, "event: {}", kind),
            ErrorContext::KeyValue(key, value) => write!(f, "{}: {}", key, value),
            ErrorContext::Custom(msg) => f.write_str(msg),
        }
    }
}

impl From<SessionId> for ErrorContext {
    fn from(id: SessionId) -> Self {
        ErrorContext::Session(id)
    }
}

impl From<EventKind> for ErrorContext {
    fn from(kind: EventKind) -> Self {
        ErrorContext::Event(kind)
    }
}

impl From<(&str, String)> for ErrorContext {
    fn from((key, value): (&str, String)) -> Self {
        ErrorContext::KeyValue(key.to_string(), value)
    }
}

impl From<(&str, &str)> for ErrorContext {
    fn from((key, value): (&str, &str)) -> Self {
        ErrorContext::KeyValue(key.to_string(), value.to_string())
    }
}

impl From<String> for ErrorContext {
    fn from(msg: String) -> Self {
        ErrorContext::Custom(msg)
    }
}

impl From<&str> for ErrorContext {
    fn from(msg: &str) -> Self {
        ErrorContext::Custom(msg.to_string())
    }
}
