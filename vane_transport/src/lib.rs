//! Vane 传输层
//!
//! 基于 Tokio 的 TCP 事件生产者。接受连接、按行解码，把连接上观察到的
//! 状况构造成事件交给 [`HandlerExecutor`](vane_dispatch::HandlerExecutor)，
//! 自身从不执行处理器回调。

pub mod connection;
pub mod service;

mod reader;
mod submit;

// 导出主要类型到 crate root
pub use crate::connection::TransportMetrics;
pub use crate::service::TcpService;
pub use vane_config::{RejectionPolicy, TransportConfig};

// 预导出
pub mod prelude {
    pub use crate::service::TcpService;
    pub use vane_config::TransportConfig;
}
