//! Vane 性能基准测试
//!
//! 测试事件路由与两种分发策略的开销。
//!
//! ```text
//! cargo bench --features benchmark
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use vane::prelude::*;

/// 基准测试辅助宏
macro_rules! bench {
    ($name:expr, $iterations:expr, $code:block) => {
        let start = Instant::now();
        let iterations: u64 = $iterations;
        for _ in 0..iterations {
            $code
        }
        let duration = start.elapsed();
        let avg_ns = duration.as_nanos() / iterations as u128;
        println!(
            "  {:30}: {:>8} ns/op ({} ops in {:?})",
            $name, avg_ns, iterations, duration
        );
    };
}

#[derive(Default)]
struct Counting(AtomicU64);

impl IoHandler for Counting {
    fn message_received(&self, _session: &Session, _message: Message) -> HandlerResult {
        self.0.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn main() {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   Vane 性能基准测试");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    bench_event_construction();
    bench_router_deliver();
    bench_executor(Strategy::OutOfOrder);
    bench_executor(Strategy::Ordered);

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   基准测试完成");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// 测试事件构造性能
fn bench_event_construction() {
    println!("\n📊 Event 基准测试:");

    let session = Session::new(SessionId::new(1));

    bench!("message_received()", 100_000, {
        let _event = Event::message_received(session.clone(), "ping");
    });

    bench!("ordering_key()", 100_000, {
        let event = Event::session_opened(session.clone());
        let _key = event.ordering_key();
    });
}

/// 测试同步路由性能
fn bench_router_deliver() {
    println!("\n📊 EventRouter 基准测试:");

    let router = EventRouter::new();
    let handler = Counting::default();
    let session = Session::new(SessionId::new(1));

    bench!("deliver()", 100_000, {
        let _ = router.deliver(Event::message_received(session.clone(), "ping"), &handler);
    });
}

/// 测试提交到投递完成的吞吐
fn bench_executor(strategy: Strategy) {
    println!("\n📊 {} 执行器基准测试:", strategy);

    let executor = ExecutorBuilder::new(DispatchConfig::default())
        .strategy(strategy)
        .build()
        .expect("构建执行器失败");
    let handler = Arc::new(Counting::default());
    let sessions: Vec<Session> = (0..64).map(|id| Session::new(SessionId::new(id))).collect();

    let total: u64 = 200_000;
    let start = Instant::now();
    for i in 0..total {
        let session = sessions[(i % 64) as usize].clone();
        let mut event = Event::message_received(session, "ping");
        // 无界队列只会在关闭后拒绝
        while let Err(rejected) = executor.submit(event, handler.clone()) {
            event = rejected.into_event();
            std::thread::yield_now();
        }
    }
    while handler.0.load(Ordering::Relaxed) < total {
        std::thread::sleep(Duration::from_micros(50));
    }
    let duration = start.elapsed();

    println!(
        "  {:30}: {:>8} ns/op ({} ops in {:?})",
        "submit + deliver",
        duration.as_nanos() / total as u128,
        total,
        duration
    );
    println!("  {}", executor.metrics().summary());
    executor.shutdown(None);
}
