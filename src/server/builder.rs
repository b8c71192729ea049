//! 服务构建器
//!
//! 按 [`VaneConfig`] 构建处理器执行器并启动 TCP 服务，服务停止后按配置的
//! 等待时长关闭执行器。

use crate::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use vane_config::{Strategy, VaneConfig};
use vane_core::IoHandler;
use vane_dispatch::{ExecutorBuilder, FailureSink, ShutdownReport};
use vane_transport::TcpService;

/// 服务构建器
///
/// # 示例
///
/// ```rust,no_run,ignore
/// use vane::Server;
///
/// #[tokio::main]
/// async fn main() -> vane::Result<()> {
///     Server::bind("127.0.0.1:8080")?
///         .handler(Arc::new(MyHandler))
///         .run(async { tokio::signal::ctrl_c().await.ok(); })
///         .await?;
///     Ok(())
/// }
/// ```
pub struct ServerBuilder {
    /// 完整配置
    config: VaneConfig,
    /// 应用处理器
    handler: Option<Arc<dyn IoHandler>>,
    /// 自定义未捕获失败接收端
    failures: Option<Arc<dyn FailureSink>>,
}

impl ServerBuilder {
    /// 使用默认配置创建
    pub fn new() -> Self {
        Self {
            config: VaneConfig::default(),
            handler: None,
            failures: None,
        }
    }

    /// 绑定到指定地址
    ///
    /// * `addr` - 形如 `"127.0.0.1:8080"` 的地址，端口必须给出
    pub fn bind(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        let (host, port) = parse_addr(&addr)?;

        let mut builder = Self::new();
        builder.config.transport.bind_address = host;
        builder.config.transport.port = port;
        Ok(builder)
    }

    /// 替换全部配置
    pub fn config(mut self, config: VaneConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置分发策略
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.config.dispatch.strategy = strategy;
        self
    }

    /// 设置应用处理器
    pub fn handler(mut self, handler: Arc<dyn IoHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// 自定义未捕获失败接收端
    pub fn failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failures = Some(sink);
        self
    }

    /// 运行服务直到 `shutdown` 完成，返回执行器的关闭结果
    pub async fn run<F>(self, shutdown: F) -> Result<ShutdownReport>
    where
        F: Future<Output = ()>,
    {
        let handler = self
            .handler
            .ok_or_else(|| Error::Custom("未设置处理器".to_string()))?;
        self.config.validate()?;

        tracing::info!("{}", self.config.dispatch.summary());
        tracing::info!("{}", self.config.transport.summary());

        let mut executor = ExecutorBuilder::new(self.config.dispatch.clone());
        if let Some(sink) = self.failures {
            executor = executor.failure_sink(sink);
        }
        let executor = executor.build()?;

        let service =
            TcpService::bind(self.config.transport.clone(), Arc::clone(&executor), handler).await?;
        let served = service.run(shutdown).await;

        // 关闭会阻塞等待执行中的回调
        let grace = self.config.dispatch.shutdown_grace();
        let report = {
            let executor = Arc::clone(&executor);
            tokio::task::spawn_blocking(move || executor.shutdown(Some(grace)))
                .await
                .map_err(|e| Error::Custom(format!("关闭执行器失败: {}", e)))?
        };

        tracing::info!(
            cancelled = report.cancelled,
            abandoned = report.abandoned_workers,
            "{}",
            executor.metrics().summary()
        );

        served?;
        Ok(report)
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 类型别名
pub type Server = ServerBuilder;

/// 把 `host:port` 拆成主机和端口
fn parse_addr(addr: &str) -> Result<(String, u16)> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| Error::Custom(format!("地址缺少端口: {}", addr)))?;
    let port = port
        .parse()
        .map_err(|_| Error::Custom(format!("端口无效: {}", addr)))?;
    Ok((host.to_string(), port))
}
