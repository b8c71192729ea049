//! 有序分发演示
//!
//! 启动一个按行解码的 TCP 服务，在日志中回显每个会话收到的消息，
//! 并统计每个会话的消息数。同一会话的回调严格按到达顺序执行。
//!
//! ```text
//! cargo run --example ordered_echo -- 127.0.0.1:9000
//! nc 127.0.0.1 9000
//! ```
//!
//! 发送 `panic` 可观察回调失败被转换为 `exception_caught`。
//!
//! ```text
//! RUST_LOG=debug VANE_STRATEGY=out_of_order cargo run --example ordered_echo
//! ```
//!
//! Ctrl-C 停止服务。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use vane::prelude::*;

#[derive(Default)]
struct OrderedEcho {
    counts: Mutex<HashMap<SessionId, u64>>,
}

impl IoHandler for OrderedEcho {
    fn service_activated(&self, service: &Service) -> HandlerResult {
        tracing::info!(service = %service.name(), "服务已启动");
        Ok(())
    }

    fn session_opened(&self, session: &Session) -> HandlerResult {
        self.counts.lock().map_err(|e| e.to_string())?.insert(session.id(), 0);
        tracing::info!(%session, "会话打开");
        Ok(())
    }

    fn message_received(&self, session: &Session, message: Message) -> HandlerResult {
        let line = message
            .downcast_ref::<String>()
            .ok_or("消息不是文本行")?;

        if line.trim() == "panic" {
            panic!("客户端要求 panic");
        }

        let seq = {
            let mut counts = self.counts.lock().map_err(|e| e.to_string())?;
            let count = counts.entry(session.id()).or_default();
            *count += 1;
            *count
        };
        tracing::info!(%session, seq, "echo: {}", line);
        Ok(())
    }

    fn session_idle(&self, session: &Session, status: IdleStatus) -> HandlerResult {
        tracing::info!(%session, %status, "会话空闲");
        Ok(())
    }

    fn exception_caught(&self, session: &Session, cause: Cause) -> HandlerResult {
        tracing::warn!(%session, error = %cause, "会话异常");
        Ok(())
    }

    fn session_closed(&self, session: &Session) -> HandlerResult {
        let total = self
            .counts
            .lock()
            .map_err(|e| e.to_string())?
            .remove(&session.id())
            .unwrap_or(0);
        tracing::info!(%session, total, "会话关闭");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> vane::Result<()> {
    vane::logging::init();

    let mut config = VaneConfig::default().load_with_env_override()?;
    if let Some(addr) = std::env::args().nth(1) {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| vane::Error::Custom(format!("地址缺少端口: {}", addr)))?;
        config.transport.bind_address = host.to_string();
        config.transport.port = port
            .parse()
            .map_err(|_| vane::Error::Custom(format!("端口无效: {}", addr)))?;
    }

    let report = Server::new()
        .config(config)
        .handler(Arc::new(OrderedEcho::default()))
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!(
        cancelled = report.cancelled,
        abandoned = report.abandoned_workers,
        "演示结束"
    );
    Ok(())
}
