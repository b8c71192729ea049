//! 执行器构建器
//!
//! 根据 [`DispatchConfig`] 选择策略并创建线程池。

use crate::executor::HandlerExecutor;
use crate::failure::{self, FailureSink};
use crate::ordered::OrderedExecutor;
use crate::out_of_order::OutOfOrderExecutor;
use crate::pool::WorkerPoolConfig;
use std::sync::Arc;
use vane_config::{DispatchConfig, Strategy};
use vane_core::{Result, VaneError};

/// 执行器构建器
///
/// # 示例
///
/// ```rust,ignore
/// use vane_config::DispatchConfig;
/// use vane_dispatch::ExecutorBuilder;
///
/// let executor = ExecutorBuilder::new(DispatchConfig::default()).build()?;
/// executor.submit(event, handler)?;
/// ```
pub struct ExecutorBuilder {
    config: DispatchConfig,
    failures: Option<Arc<dyn FailureSink>>,
}

impl ExecutorBuilder {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            failures: None,
        }
    }

    /// 覆盖策略
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// 设置工作线程数
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.config.worker_threads = Some(threads);
        self
    }

    /// 设置任务队列容量
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = Some(capacity);
        self
    }

    /// 自定义未捕获失败接收端，替代配置中的策略
    pub fn failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failures = Some(sink);
        self
    }

    /// 构建执行器
    pub fn build(self) -> Result<Arc<dyn HandlerExecutor>> {
        self.config
            .validate()
            .map_err(|e| VaneError::config(e.to_string()))?;

        let pool = WorkerPoolConfig {
            size: self.config.worker_threads.unwrap_or_else(num_cpus::get),
            queue_capacity: self.config.queue_capacity,
            thread_name: self.config.thread_name.clone(),
        };
        let failures = self
            .failures
            .unwrap_or_else(|| failure::sink_for(self.config.uncaught_policy));

        tracing::info!(
            strategy = %self.config.strategy,
            workers = pool.size,
            queue_capacity = ?pool.queue_capacity,
            "创建处理器执行器"
        );

        let executor: Arc<dyn HandlerExecutor> = match self.config.strategy {
            Strategy::OutOfOrder => Arc::new(OutOfOrderExecutor::new(pool, failures)?),
            Strategy::Ordered => Arc::new(OrderedExecutor::new(pool, failures)?),
        };
        Ok(executor)
    }
}
