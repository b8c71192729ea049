//! 有序执行器
//!
//! 同一排队键（会话，服务事件为服务）上的事件严格按提交顺序投递，前一个回调
//! 返回后下一个才开始；不同键之间在共享线程池上并发。
//!
//! 每个键对应一个等待队列，键在表中存在即表示“活跃”：已有一个排空任务被调度
//! 或正在执行。排空任务每次只投递一个事件，队列非空时把自己重新提交到线程池，
//! 让出线程给其他会话。
//!
//! 配置了队列容量时，容量同时约束两处：线程池队列中等待调度的键数，以及每个键
//! 上等待中的事件数。繁忙会话超出容量时被拒绝，不会挤占其他会话。

use crate::error::{DispatchRejected, RejectReason};
use crate::executor::{HandlerExecutor, ShutdownReport};
use crate::failure::FailureSink;
use crate::metrics::DispatchMetrics;
use crate::pool::{Task, WorkerPool, WorkerPoolConfig};
use crate::runner::EventRunner;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use vane_config::Strategy;
use vane_core::{Event, IoHandler, OrderingKey, Result};

struct Pending {
    event: Event,
    handler: Arc<dyn IoHandler>,
}

type Queues = HashMap<OrderingKey, VecDeque<Pending>>;

struct OrderedInner {
    queues: Mutex<Queues>,
    pool: WorkerPool<DrainTask>,
    runner: EventRunner,
    /// 每个键上等待事件数上限
    capacity: Option<usize>,
    closed: AtomicBool,
}

impl OrderedInner {
    fn queues(&self) -> MutexGuard<'_, Queues> {
        // 回调在锁外执行，锁不会因回调 panic 而中毒
        match self.queues.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// 从队列中取出的事件被取消
    fn cancel(&self, key: OrderingKey) {
        let dropped = self.queues().remove(&key).map_or(0, |q| q.len() as u64);
        if dropped > 0 {
            self.runner.metrics().record_cancelled(dropped);
            tracing::debug!(?key, dropped, "线程池已关闭，取消排队事件");
        }
    }
}

/// 排空一个键的队列
pub struct DrainTask {
    inner: Arc<OrderedInner>,
    key: OrderingKey,
}

impl Task for DrainTask {
    fn run(self) {
        let DrainTask { inner, key } = self;

        loop {
            let next = {
                let mut queues = inner.queues();
                match queues.get_mut(&key).and_then(VecDeque::pop_front) {
                    Some(pending) => pending,
                    None => {
                        queues.remove(&key);
                        return;
                    }
                }
            };

            inner.runner.run(next.event, next.handler.as_ref());

            {
                let mut queues = inner.queues();
                match queues.get(&key) {
                    None => return,
                    Some(queue) if queue.is_empty() => {
                        queues.remove(&key);
                        return;
                    }
                    Some(_) => {}
                }
            }

            let task = DrainTask {
                inner: Arc::clone(&inner),
                key,
            };
            match inner.pool.execute(task) {
                Ok(()) => return,
                // 队列满时在当前线程继续，已接受的事件不能丢
                Err(rejected) if rejected.reason == RejectReason::Saturated => continue,
                Err(_) => {
                    inner.cancel(key);
                    return;
                }
            }
        }
    }
}

/// 有序执行器
pub struct OrderedExecutor {
    inner: Arc<OrderedInner>,
}

impl OrderedExecutor {
    /// 创建执行器并启动线程池
    pub fn new(pool: WorkerPoolConfig, failures: Arc<dyn FailureSink>) -> Result<Self> {
        let metrics = Arc::new(DispatchMetrics::new());
        let capacity = pool.queue_capacity;
        Ok(Self {
            inner: Arc::new(OrderedInner {
                queues: Mutex::new(HashMap::new()),
                pool: WorkerPool::new(pool)?,
                runner: EventRunner::new(failures, metrics),
                capacity,
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// 当前有排队或执行中事件的键数
    pub fn active_keys(&self) -> usize {
        self.inner.queues().len()
    }

    /// 指定键上等待中的事件数（不含正在执行的）
    pub fn pending(&self, key: OrderingKey) -> usize {
        self.inner.queues().get(&key).map_or(0, VecDeque::len)
    }

    fn reject(&self, reason: RejectReason, event: Event) -> DispatchRejected {
        self.inner.runner.metrics().record_rejected();
        tracing::debug!(event = %event.kind(), %reason, "有序分发被拒绝");
        DispatchRejected::new(reason, event)
    }
}

impl HandlerExecutor for OrderedExecutor {
    fn submit(&self, event: Event, handler: Arc<dyn IoHandler>) -> std::result::Result<(), DispatchRejected> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(self.reject(RejectReason::Shutdown, event));
        }

        let key = event.ordering_key();
        let mut queues = self.inner.queues();

        if let Some(queue) = queues.get_mut(&key) {
            if self.inner.capacity.is_some_and(|cap| queue.len() >= cap) {
                drop(queues);
                return Err(self.reject(RejectReason::Saturated, event));
            }
            queue.push_back(Pending { event, handler });
            self.inner.runner.metrics().record_submitted();
            return Ok(());
        }

        let task = DrainTask {
            inner: Arc::clone(&self.inner),
            key,
        };
        if let Err(rejected) = self.inner.pool.execute(task) {
            drop(queues);
            return Err(self.reject(rejected.reason, event));
        }

        queues.insert(key, VecDeque::from([Pending { event, handler }]));
        self.inner.runner.metrics().record_submitted();
        Ok(())
    }

    fn strategy(&self) -> Strategy {
        Strategy::Ordered
    }

    fn metrics(&self) -> &DispatchMetrics {
        self.inner.runner.metrics()
    }

    fn shutdown(&self, grace: Option<Duration>) -> ShutdownReport {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return ShutdownReport::default();
        }

        let before = self.inner.runner.metrics().cancelled();
        let pool = self.inner.pool.shutdown(grace);

        let swept: u64 = {
            let mut queues = self.inner.queues();
            queues.drain().map(|(_, queue)| queue.len() as u64).sum()
        };
        self.inner.runner.metrics().record_cancelled(swept);

        let cancelled = self.inner.runner.metrics().cancelled() - before;
        tracing::info!(cancelled, abandoned = pool.abandoned_workers, "有序执行器已关闭");

        ShutdownReport {
            cancelled,
            abandoned_workers: pool.abandoned_workers,
        }
    }

    fn is_shutdown(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}
