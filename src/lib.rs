//! # Vane - 连接事件通知与分发层
//!
//! Vane 把传输层观察到的连接状况（会话打开、消息到达、空闲、异常、关闭等）
//! 建模为事件，并通过可配置的执行策略把它们投递到应用实现的处理器上，
//! 处理器回调始终在工作线程池上执行，从不占用 I/O 线程。
//!
//! ## 特性
//!
//! - 11 种事件，`match` 穷尽路由，新增事件无法被遗漏
//! - 乱序策略：吞吐优先，事件之间不保留顺序
//! - 有序策略：同一会话内 FIFO，不同会话在共享线程池上并发
//! - 回调失败自动转换为 `exception_caught`，未捕获失败上报到统一通道
//! - 基于 Tokio 的 TCP 事件生产者（`transport` 特性）
//!
//! ## 快速开始
//!
//! ```rust,no_run,ignore
//! use std::sync::Arc;
//! use vane::prelude::*;
//!
//! struct Echo;
//!
//! impl IoHandler for Echo {
//!     fn message_received(&self, session: &Session, message: Message) -> HandlerResult {
//!         tracing::info!(%session, ?message, "收到消息");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> vane::Result<()> {
//!     vane::logging::init();
//!     Server::bind("127.0.0.1:8080")?
//!         .handler(Arc::new(Echo))
//!         .run(async { tokio::signal::ctrl_c().await.ok(); })
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## 模块组织
//!
//! ### 配置模块
//! - VaneConfig - 完整配置
//! - DispatchConfig - 分发策略与线程池配置
//! - TransportConfig - TCP 传输配置
//!
//! ### 核心模块
//! - Event - 事件
//! - IoHandler - 处理器接口
//! - EventRouter - 事件路由
//!
//! ### 分发模块
//! - HandlerExecutor - 执行器抽象
//! - OutOfOrderExecutor / OrderedExecutor - 两种策略
//! - ExecutorBuilder - 按配置构建执行器
//!
//! ### 传输模块
//! - TcpService - TCP 事件生产者

// ============================================================================
// Conditional Compilation Based on Features
// ============================================================================

// Server API
#[cfg(feature = "transport")]
pub mod server;

#[cfg(feature = "transport")]
pub use crate::server::{Server, ServerBuilder};

pub mod logging;

// ============================================================================
// Crate Re-exports (for advanced users)
// ============================================================================

pub use vane_config;
pub use vane_core;
pub use vane_dispatch;

#[cfg(feature = "transport")]
pub use vane_transport;

pub use vane_config::{DispatchConfig, Strategy, TransportConfig, VaneConfig};
pub use vane_core::{
    Cause, Event, EventKind, EventRouter, HandlerResult, IdleStatus, IoHandler, Message, Service,
    Session, SessionId,
};
pub use vane_dispatch::{ExecutorBuilder, FailureSink, HandlerExecutor, ShutdownReport};

// ============================================================================
// Prelude Module
// ============================================================================

/// 预导出常用类型
///
/// 通过 `use vane::prelude::*;` 导入所有常用类型
pub mod prelude {
    pub use vane_config::{ConfigError, DispatchConfig, Strategy, TransportConfig, VaneConfig};

    pub use vane_core::prelude::*;

    pub use vane_dispatch::prelude::*;

    #[cfg(feature = "transport")]
    pub use crate::server::{Server, ServerBuilder};

    #[cfg(feature = "transport")]
    pub use vane_transport::prelude::*;
}

// ============================================================================
// Error Types
// ============================================================================

/// Vane 统一 Result 类型
pub type Result<T> = std::result::Result<T, Error>;

/// Vane 统一错误枚举
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 核心错误
    #[error(transparent)]
    Core(#[from] vane_core::VaneError),

    /// 配置错误
    #[error(transparent)]
    Config(#[from] vane_config::ConfigError),

    /// 分发被拒绝
    #[error(transparent)]
    Dispatch(#[from] vane_dispatch::DispatchRejected),

    /// IO 错误
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 自定义错误
    #[error("{0}")]
    Custom(String),
}

// ============================================================================
// Version Information
// ============================================================================

/// Vane 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Vane 包名
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_config() {
        let err: Error = vane_config::ConfigError::Validation("端口无效".to_string()).into();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "配置验证失败: 端口无效");
    }

    #[test]
    fn test_error_from_rejected() {
        let event = Event::session_opened(Session::new(SessionId::new(1)));
        let rejected =
            vane_dispatch::DispatchRejected::new(vane_dispatch::RejectReason::Shutdown, event);
        let err: Error = rejected.into();
        assert!(err.to_string().contains("已关闭"));
    }

    #[test]
    fn test_version() {
        assert_eq!(NAME, "vane");
        assert!(!VERSION.is_empty());
    }
}
