//! TCP 服务
//!
//! 接受连接、为每个会话启动读取任务，并在服务生命周期的首尾提交服务事件。

use crate::connection::{ConnectionGuard, TransportMetrics};
use crate::reader;
use crate::submit::Submitter;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use vane_config::TransportConfig;
use vane_core::{
    Event, IoHandler, Result, Service, ServiceId, Session, SessionIdGenerator, VaneError,
};
use vane_dispatch::HandlerExecutor;

static NEXT_SERVICE_ID: AtomicU64 = AtomicU64::new(1);

/// TCP 服务
///
/// # 示例
///
/// ```rust,ignore
/// let service = TcpService::bind(config.transport, executor, handler).await?;
/// service.run(tokio::signal::ctrl_c().map(|_| ())).await?;
/// ```
pub struct TcpService {
    listener: TcpListener,
    config: TransportConfig,
    service: Service,
    submitter: Submitter,
    ids: SessionIdGenerator,
    metrics: Arc<TransportMetrics>,
}

impl TcpService {
    /// 绑定监听地址
    pub async fn bind(
        config: TransportConfig,
        executor: Arc<dyn HandlerExecutor>,
        handler: Arc<dyn IoHandler>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| VaneError::config(e.to_string()))?;

        let bind_addr = config.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| VaneError::transport(format!("绑定地址失败: {}", e)))?;

        let id = ServiceId::new(NEXT_SERVICE_ID.fetch_add(1, Ordering::Relaxed));
        let service = Service::new(id, bind_addr);
        let metrics = Arc::new(TransportMetrics::new());
        let submitter = Submitter::new(&config, executor, handler, Arc::clone(&metrics));

        Ok(Self {
            listener,
            config,
            service,
            submitter,
            ids: SessionIdGenerator::new(),
            metrics,
        })
    }

    /// 实际监听地址
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// 服务句柄
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// 传输层指标
    pub fn metrics(&self) -> Arc<TransportMetrics> {
        Arc::clone(&self.metrics)
    }

    /// 运行服务直到 `shutdown` 完成
    ///
    /// 停止时先通知所有会话结束并等待它们提交 `SessionClosed`，
    /// 最后提交 `ServiceInactivated`。
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = self.local_addr()?;
        tracing::info!(
            service = %self.service.name(),
            addr = %local_addr,
            max_connections = ?self.config.max_connections,
            read_idle_secs = ?self.config.read_idle_secs,
            rejection_policy = %self.config.rejection_policy,
            "TCP 服务启动"
        );

        self.submitter
            .submit(Event::service_activated(self.service.clone()))
            .await;

        let (closing_tx, closing_rx) = watch::channel(false);
        let mut sessions = JoinSet::new();
        let limit = self.config.max_connections.map(|n| n as usize);
        let read_idle = self.config.read_idle_secs.map(Duration::from_secs);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "接受连接失败");
                            continue;
                        }
                    };

                    // 超过上限的连接直接关闭，不产生事件
                    let Some(guard) = ConnectionGuard::acquire(&self.metrics, limit) else {
                        tracing::debug!(remote = %remote_addr, "连接数已达上限，拒绝连接");
                        drop(stream);
                        continue;
                    };

                    let session = Session::with_remote(self.ids.next(), remote_addr);
                    sessions.spawn(reader::serve(
                        stream,
                        session,
                        self.submitter.clone(),
                        read_idle,
                        self.config.max_line_length,
                        closing_rx.clone(),
                        guard,
                    ));
                }
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "会话任务异常退出");
                    }
                }
            }
        }

        tracing::info!(sessions = sessions.len(), "TCP 服务停止，等待会话结束");
        let _ = closing_tx.send(true);
        while let Some(joined) = sessions.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "会话任务异常退出");
            }
        }

        self.submitter
            .submit(Event::service_inactivated(self.service.clone()))
            .await;

        tracing::info!("{}", self.metrics.summary());
        Ok(())
    }
}
