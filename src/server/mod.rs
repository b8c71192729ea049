//! 高层服务 API
//!
//! 一次调用完成执行器构建、TCP 服务绑定、运行与关闭。

mod builder;

pub use builder::{Server, ServerBuilder};
