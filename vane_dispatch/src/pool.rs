//! 工作线程池
//!
//! 固定数量的命名 OS 线程从共享队列中取任务执行。提交是非阻塞的：
//! 有界队列满时立即拒绝，关闭后同样立即拒绝。

use crate::error::{PoolRejected, RejectReason};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use vane_core::{Result, VaneError};

thread_local! {
    static IN_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// 可由线程池执行的任务
pub trait Task: Send + 'static {
    fn run(self);
}

/// 闭包任务
pub struct Job(Box<dyn FnOnce() + Send + 'static>);

impl Job {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(f))
    }
}

impl Task for Job {
    fn run(self) {
        (self.0)()
    }
}

/// 线程池配置
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// 工作线程数
    pub size: usize,
    /// 队列容量，None 表示无界
    pub queue_capacity: Option<usize>,
    /// 线程名前缀
    pub thread_name: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            size: num_cpus::get(),
            queue_capacity: None,
            thread_name: "vane-worker".to_string(),
        }
    }
}

/// 关闭结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolShutdown {
    /// 尚未开始即被取消的任务数
    pub cancelled_tasks: u64,
    /// 等待期结束时仍在执行、被放弃的线程数
    pub abandoned_workers: usize,
}

#[derive(Debug, Default)]
struct PoolState {
    stopping: AtomicBool,
    cancelled: AtomicU64,
    busy: AtomicUsize,
}

/// 工作线程池
pub struct WorkerPool<T: Task> {
    sender: RwLock<Option<Sender<T>>>,
    state: Arc<PoolState>,
    /// 所有线程退出后断开
    exited: Receiver<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl<T: Task> WorkerPool<T> {
    /// 创建并启动线程池
    pub fn new(config: WorkerPoolConfig) -> Result<Self> {
        if config.size == 0 {
            return Err(VaneError::config("工作线程数不能为 0"));
        }

        let (tx, rx) = match config.queue_capacity {
            Some(capacity) => channel::bounded(capacity),
            None => channel::unbounded(),
        };
        let (exit_tx, exit_rx) = channel::bounded::<()>(0);
        let state = Arc::new(PoolState::default());

        let mut handles = Vec::with_capacity(config.size);
        for id in 0..config.size {
            let rx = rx.clone();
            let state = Arc::clone(&state);
            let exit_tx = exit_tx.clone();

            let handle = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, id))
                .spawn(move || worker_loop(id, rx, state, exit_tx))
                .map_err(|e| VaneError::from(e).with_context(("worker", id.to_string())))?;
            handles.push(handle);
        }

        tracing::info!(
            workers = config.size,
            queue_capacity = ?config.queue_capacity,
            "工作线程池启动"
        );

        Ok(Self {
            sender: RwLock::new(Some(tx)),
            state,
            exited: exit_rx,
            handles: Mutex::new(handles),
            size: config.size,
        })
    }

    /// 提交任务，不阻塞
    pub fn execute(&self, task: T) -> std::result::Result<(), PoolRejected<T>> {
        let guard = match self.sender.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let Some(sender) = guard.as_ref() else {
            return Err(PoolRejected {
                reason: RejectReason::Shutdown,
                task,
            });
        };

        sender.try_send(task).map_err(|e| match e {
            TrySendError::Full(task) => PoolRejected {
                reason: RejectReason::Saturated,
                task,
            },
            TrySendError::Disconnected(task) => PoolRejected {
                reason: RejectReason::Shutdown,
                task,
            },
        })
    }

    /// 工作线程数
    pub fn size(&self) -> usize {
        self.size
    }

    /// 队列中等待的任务数
    pub fn queued(&self) -> usize {
        match self.sender.read() {
            Ok(guard) => guard.as_ref().map_or(0, Sender::len),
            Err(poisoned) => poisoned.into_inner().as_ref().map_or(0, Sender::len),
        }
    }

    /// 正在执行任务的线程数
    pub fn busy(&self) -> usize {
        self.state.busy.load(Ordering::Relaxed)
    }

    /// 是否已开始关闭
    pub fn is_shutdown(&self) -> bool {
        self.state.stopping.load(Ordering::Acquire)
    }

    /// 关闭线程池
    ///
    /// 立即停止接受新任务，丢弃队列中尚未开始的任务，等待执行中的任务
    /// 最多 `grace`（`None` 表示一直等待），之后仍未结束的线程被放弃。
    /// 在工作线程内部调用时不等待。重复调用返回空结果。
    pub fn shutdown(&self, grace: Option<Duration>) -> PoolShutdown {
        let sender = {
            let mut guard = match self.sender.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            self.state.stopping.store(true, Ordering::Release);
            guard.take()
        };

        if sender.is_none() {
            return PoolShutdown::default();
        }
        drop(sender);

        let grace = if IN_WORKER.with(Cell::get) {
            Some(Duration::ZERO)
        } else {
            grace
        };

        let all_exited = match grace {
            None => {
                let _ = self.exited.recv();
                true
            }
            Some(grace) => matches!(
                self.exited.recv_timeout(grace),
                Err(RecvTimeoutError::Disconnected)
            ),
        };

        let handles = match self.handles.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        let mut abandoned_workers = 0;
        for handle in handles {
            if all_exited || handle.is_finished() {
                let _ = handle.join();
            } else {
                abandoned_workers += 1;
            }
        }

        let report = PoolShutdown {
            cancelled_tasks: self.state.cancelled.load(Ordering::Acquire),
            abandoned_workers,
        };

        tracing::info!(
            cancelled = report.cancelled_tasks,
            abandoned = report.abandoned_workers,
            "工作线程池已关闭"
        );
        report
    }
}

impl<T: Task> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        // 断开队列：剩余任务被丢弃，线程随后退出
        self.state.stopping.store(true, Ordering::Release);
        if let Ok(mut guard) = self.sender.write() {
            guard.take();
        }
    }
}

fn worker_loop<T: Task>(id: usize, rx: Receiver<T>, state: Arc<PoolState>, _exit: Sender<()>) {
    IN_WORKER.with(|flag| flag.set(true));
    tracing::debug!(worker = id, "工作线程启动");

    for task in rx.iter() {
        if state.stopping.load(Ordering::Acquire) {
            drop(task);
            state.cancelled.fetch_add(1, Ordering::AcqRel);
            continue;
        }

        state.busy.fetch_add(1, Ordering::Relaxed);
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            let err = vane_core::PanicError::from_payload(payload);
            tracing::error!(worker = id, error = %err, "任务 panic，工作线程继续运行");
        }
        state.busy.fetch_sub(1, Ordering::Relaxed);
    }

    tracing::debug!(worker = id, "队列关闭，工作线程退出");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::mpsc;

    fn pool(size: usize, capacity: Option<usize>) -> WorkerPool<Job> {
        WorkerPool::new(WorkerPoolConfig {
            size,
            queue_capacity: capacity,
            thread_name: "test-worker".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = WorkerPool::<Job>::new(WorkerPoolConfig {
            size: 0,
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_executes_all_tasks() {
        let pool = pool(4, None);
        let (tx, rx) = mpsc::channel();
        for i in 0..100 {
            let tx = tx.clone();
            pool.execute(Job::new(move || tx.send(i).unwrap())).unwrap();
        }
        drop(tx);

        let mut got: Vec<i32> = rx.iter().take(100).collect();
        got.sort();
        assert_eq!(got, (0..100).collect::<Vec<_>>());
        assert_eq!(pool.shutdown(None), PoolShutdown::default());
    }

    #[test]
    fn test_threads_are_named() {
        let pool = pool(1, None);
        let (tx, rx) = mpsc::channel();
        pool.execute(Job::new(move || {
            tx.send(thread::current().name().map(str::to_string)).unwrap();
        }))
        .unwrap();
        assert_eq!(rx.recv().unwrap().as_deref(), Some("test-worker-0"));
    }

    #[test]
    fn test_bounded_queue_saturates() {
        let pool = pool(1, Some(1));
        let gate = Arc::new(Barrier::new(2));
        let (started_tx, started_rx) = mpsc::channel();

        let g = Arc::clone(&gate);
        pool.execute(Job::new(move || {
            started_tx.send(()).unwrap();
            g.wait();
        }))
        .unwrap();
        started_rx.recv().unwrap();

        // 唯一的线程被占用，队列容量为 1
        pool.execute(Job::new(|| {})).unwrap();
        let rejected = pool.execute(Job::new(|| {})).unwrap_err();
        assert_eq!(rejected.reason, RejectReason::Saturated);

        gate.wait();
        pool.shutdown(None);
    }

    #[test]
    fn test_execute_after_shutdown_rejected() {
        let pool = pool(2, None);
        pool.shutdown(None);
        assert!(pool.is_shutdown());
        let rejected = pool.execute(Job::new(|| {})).unwrap_err();
        assert_eq!(rejected.reason, RejectReason::Shutdown);
        assert_eq!(pool.shutdown(None), PoolShutdown::default());
    }

    #[test]
    fn test_shutdown_cancels_queued_tasks() {
        let pool = Arc::new(pool(1, None));
        let gate = Arc::new(Barrier::new(2));
        let (started_tx, started_rx) = mpsc::channel();
        let ran = Arc::new(AtomicUsize::new(0));

        let g = Arc::clone(&gate);
        pool.execute(Job::new(move || {
            started_tx.send(()).unwrap();
            g.wait();
        }))
        .unwrap();
        started_rx.recv().unwrap();

        for _ in 0..5 {
            let ran = Arc::clone(&ran);
            pool.execute(Job::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }

        // 关闭开始后才放行正在执行的任务
        let watcher = Arc::clone(&pool);
        let releaser = thread::spawn(move || {
            while !watcher.is_shutdown() {
                thread::sleep(Duration::from_millis(1));
            }
            gate.wait();
        });
        let report = pool.shutdown(None);
        releaser.join().unwrap();

        assert_eq!(report.cancelled_tasks, 5);
        assert_eq!(report.abandoned_workers, 0);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_shutdown_abandons_after_grace() {
        let pool = pool(1, None);
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        pool.execute(Job::new(move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv();
        }))
        .unwrap();
        started_rx.recv().unwrap();

        let report = pool.shutdown(Some(Duration::from_millis(20)));
        assert_eq!(report.abandoned_workers, 1);
        release_tx.send(()).unwrap();
    }

    #[test]
    fn test_worker_survives_panic() {
        let pool = pool(1, None);
        pool.execute(Job::new(|| panic!("task failed"))).unwrap();

        let (tx, rx) = mpsc::channel();
        pool.execute(Job::new(move || tx.send(42).unwrap())).unwrap();
        assert_eq!(rx.recv().unwrap(), 42);
    }
}
