//! 日志初始化
//!
//! 安装 `tracing-subscriber` 的 fmt 订阅者，过滤规则取自 `RUST_LOG`，
//! 未设置时使用 `info`。输出中带线程名，便于区分工作线程与 I/O 线程。

use tracing_subscriber::{EnvFilter, fmt};

/// 默认过滤规则
pub const DEFAULT_FILTER: &str = "info";

/// 初始化全局日志
///
/// 重复调用时后续调用不生效。
pub fn init() {
    init_with(DEFAULT_FILTER);
}

/// 以指定的默认过滤规则初始化全局日志，`RUST_LOG` 优先
pub fn init_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let installed = fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(version = crate::VERSION, "日志已初始化");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init();
        init_with("debug");
    }
}
