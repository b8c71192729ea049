//! Vane 事件分发层
//!
//! 把传输层产生的事件从检测线程上解耦出来，交给工作线程池执行。
//! 提供两种可在配置期切换的策略：
//!
//! - [`OutOfOrderExecutor`] - 每个事件独立执行，不保证任何顺序
//! - [`OrderedExecutor`] - 同一会话内 FIFO，不同会话并发

pub mod builder;
pub mod error;
pub mod executor;
pub mod failure;
pub mod metrics;
pub mod ordered;
pub mod out_of_order;
pub mod pool;

mod runner;

// 导出主要类型到 crate root
pub use crate::builder::ExecutorBuilder;
pub use crate::error::{DispatchRejected, PoolRejected, RejectReason};
pub use crate::executor::{HandlerExecutor, ShutdownReport};
pub use crate::failure::{AbortFailureSink, FailureSink, LogFailureSink, UncaughtFailure};
pub use crate::metrics::DispatchMetrics;
pub use crate::ordered::OrderedExecutor;
pub use crate::out_of_order::OutOfOrderExecutor;
pub use crate::pool::{Job, PoolShutdown, Task, WorkerPool, WorkerPoolConfig};
pub use vane_config::Strategy;

// 预导出
pub mod prelude {
    pub use crate::builder::ExecutorBuilder;
    pub use crate::error::{DispatchRejected, RejectReason};
    pub use crate::executor::{HandlerExecutor, ShutdownReport};
    pub use crate::failure::{FailureSink, UncaughtFailure};
    pub use vane_config::Strategy;
}
