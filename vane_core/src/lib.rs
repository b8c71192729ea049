//! Vane 核心：事件模型、处理器接口与事件路由
//!
//! 传输层把观察到的连接状况构造成 [`Event`]，分发层通过 [`EventRouter`]
//! 把事件投递到应用实现的 [`IoHandler`] 上对应的方法。

pub mod error;
pub mod event;
pub mod handler;
pub mod router;
pub mod session;

// 导出主要类型到 crate root
pub use crate::error::{ErrorContext, PanicError, Result, VaneError, VaneErrorKind};
pub use crate::event::{Cause, Event, EventKind, IdleStatus, Message, OrderingKey};
pub use crate::handler::{BoxError, HandlerResult, IoHandler};
pub use crate::router::{EventRouter, RouteFailure};
pub use crate::session::{Service, ServiceId, Session, SessionId, SessionIdGenerator};

// 预导出
pub mod prelude {
    pub use crate::error::{Result, VaneError};
    pub use crate::event::{Cause, Event, EventKind, IdleStatus, Message};
    pub use crate::handler::{BoxError, HandlerResult, IoHandler};
    pub use crate::router::EventRouter;
    pub use crate::session::{Service, Session, SessionId};
}
