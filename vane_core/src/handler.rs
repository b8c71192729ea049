//! 处理器接口
//!
//! 应用通过实现 [`IoHandler`] 接收连接事件。

use crate::event::{Cause, IdleStatus, Message};
use crate::session::{Service, Session};

/// 处理器返回的错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 处理器回调结果
///
/// `Err` 表示回调中出现了未处理的失败，与 panic 同等对待。
pub type HandlerResult = std::result::Result<(), BoxError>;

/// 连接事件处理器
///
/// 所有回调都在分发层的工作线程上执行，绝不在观察到传输状况的线程上执行，
/// 因此回调中可以阻塞。
///
/// 同一个处理器会被所有会话共享，乱序策略下同一会话的两个事件也可能
/// 在不同线程上并发执行。实现必须是无状态的，或者自行同步内部状态。
///
/// 除 `exception_caught` 外，任何回调返回 `Err` 或 panic 都会被转换为
/// 同一会话上的一次 `exception_caught` 调用。`exception_caught` 自身的
/// 失败会被上报到进程级的未捕获失败通道，不会再次回调。
#[allow(unused_variables)]
pub trait IoHandler: Send + Sync {
    /// 会话已打开
    fn session_opened(&self, session: &Session) -> HandlerResult {
        Ok(())
    }

    /// 会话已关闭
    fn session_closed(&self, session: &Session) -> HandlerResult {
        Ok(())
    }

    /// 会话空闲
    fn session_idle(&self, session: &Session, status: IdleStatus) -> HandlerResult {
        Ok(())
    }

    /// 收到消息
    fn message_received(&self, session: &Session, message: Message) -> HandlerResult {
        Ok(())
    }

    /// 消息已写出
    fn message_sent(&self, session: &Session, message: Message) -> HandlerResult {
        Ok(())
    }

    /// 服务已激活
    fn service_activated(&self, service: &Service) -> HandlerResult {
        Ok(())
    }

    /// 服务已停止
    fn service_inactivated(&self, service: &Service) -> HandlerResult {
        Ok(())
    }

    /// 会话上捕获到失败
    ///
    /// 默认实现记录 warn 日志。
    fn exception_caught(&self, session: &Session, cause: Cause) -> HandlerResult {
        tracing::warn!(session = %session.id(), error = %cause, "未处理的会话异常");
        Ok(())
    }

    /// 安全握手开始
    fn handshake_started(&self, session: &Session) -> HandlerResult {
        Ok(())
    }

    /// 安全握手完成
    fn handshake_completed(&self, session: &Session) -> HandlerResult {
        Ok(())
    }

    /// 安全层已关闭
    fn secure_closed(&self, session: &Session) -> HandlerResult {
        Ok(())
    }
}
