//! 乱序执行器
//!
//! 每个事件作为独立任务直接交给共享线程池，事件之间不保留任何顺序，
//! 即使属于同一会话。同一会话的两个事件可能在不同线程上并发执行。

use crate::error::DispatchRejected;
use crate::executor::{HandlerExecutor, ShutdownReport};
use crate::failure::FailureSink;
use crate::metrics::DispatchMetrics;
use crate::pool::{Task, WorkerPool, WorkerPoolConfig};
use crate::runner::EventRunner;
use std::sync::Arc;
use std::time::Duration;
use vane_config::Strategy;
use vane_core::{Event, IoHandler, Result};

/// 单个事件的投递任务
pub struct EventTask {
    event: Event,
    handler: Arc<dyn IoHandler>,
    runner: Arc<EventRunner>,
}

impl Task for EventTask {
    fn run(self) {
        self.runner.run(self.event, self.handler.as_ref());
    }
}

/// 乱序执行器
pub struct OutOfOrderExecutor {
    pool: WorkerPool<EventTask>,
    runner: Arc<EventRunner>,
}

impl OutOfOrderExecutor {
    /// 创建执行器并启动线程池
    pub fn new(pool: WorkerPoolConfig, failures: Arc<dyn FailureSink>) -> Result<Self> {
        let metrics = Arc::new(DispatchMetrics::new());
        Ok(Self {
            pool: WorkerPool::new(pool)?,
            runner: Arc::new(EventRunner::new(failures, metrics)),
        })
    }

    /// 线程池
    pub fn pool(&self) -> &WorkerPool<EventTask> {
        &self.pool
    }
}

impl HandlerExecutor for OutOfOrderExecutor {
    fn submit(&self, event: Event, handler: Arc<dyn IoHandler>) -> std::result::Result<(), DispatchRejected> {
        let task = EventTask {
            event,
            handler,
            runner: Arc::clone(&self.runner),
        };

        match self.pool.execute(task) {
            Ok(()) => {
                self.runner.metrics().record_submitted();
                Ok(())
            }
            Err(rejected) => {
                self.runner.metrics().record_rejected();
                let reason = rejected.reason;
                let event = rejected.into_task().event;
                tracing::debug!(event = %event.kind(), %reason, "乱序分发被拒绝");
                Err(DispatchRejected::new(reason, event))
            }
        }
    }

    fn strategy(&self) -> Strategy {
        Strategy::OutOfOrder
    }

    fn metrics(&self) -> &DispatchMetrics {
        self.runner.metrics()
    }

    fn shutdown(&self, grace: Option<Duration>) -> ShutdownReport {
        let pool = self.pool.shutdown(grace);
        self.runner.metrics().record_cancelled(pool.cancelled_tasks);
        ShutdownReport {
            cancelled: pool.cancelled_tasks,
            abandoned_workers: pool.abandoned_workers,
        }
    }

    fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }
}
