//! 事件路由
//!
//! 事件类型到处理器方法的映射只存在于此处。

use crate::error::PanicError;
use crate::event::{Cause, Event, EventKind};
use crate::handler::{HandlerResult, IoHandler};
use crate::session::Session;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// 一次路由调用中处理器失败的记录
#[derive(Debug, Clone)]
pub struct RouteFailure {
    /// 失败时正在投递的事件类型
    pub kind: EventKind,
    /// 所属会话，服务事件为 `None`
    pub session: Option<Session>,
    /// 处理器返回的错误或 panic
    pub cause: Cause,
}

impl fmt::Display for RouteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.session {
            Some(session) => write!(f, "{} 在 {} 上失败: {}", self.kind, session, self.cause),
            None => write!(f, "{} 失败: {}", self.kind, self.cause),
        }
    }
}

/// 事件路由器
///
/// 无状态，可在任意多个工作线程间共享。
#[derive(Debug, Clone, Copy, Default)]
pub struct EventRouter;

impl EventRouter {
    pub const fn new() -> Self {
        EventRouter
    }

    /// 把事件投递到处理器上唯一对应的方法
    ///
    /// 处理器返回的 `Err` 和回调中的 panic 都作为 [`RouteFailure`] 返回。
    pub fn deliver(&self, event: Event, handler: &dyn IoHandler) -> Result<(), RouteFailure> {
        let kind = event.kind();
        let session = event.session().cloned();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| Self::route(event, handler)));

        let cause: Cause = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => Arc::from(err),
            Err(payload) => Arc::new(PanicError::from_payload(payload)),
        };

        Err(RouteFailure {
            kind,
            session,
            cause,
        })
    }

    fn route(event: Event, handler: &dyn IoHandler) -> HandlerResult {
        match event {
            Event::SessionOpened { session } => handler.session_opened(&session),
            Event::SessionClosed { session } => handler.session_closed(&session),
            Event::SessionIdle { session, status } => handler.session_idle(&session, status),
            Event::MessageReceived { session, message } => {
                handler.message_received(&session, message)
            }
            Event::MessageSent { session, message } => handler.message_sent(&session, message),
            Event::ServiceActivated { service } => handler.service_activated(&service),
            Event::ServiceInactivated { service } => handler.service_inactivated(&service),
            Event::ExceptionCaught { session, cause } => handler.exception_caught(&session, cause),
            Event::HandshakeStarted { session } => handler.handshake_started(&session),
            Event::HandshakeCompleted { session } => handler.handshake_completed(&session),
            Event::SecureClosed { session } => handler.secure_closed(&session),
        }
    }
}
