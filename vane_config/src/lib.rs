//! 配置管理系统
//!
//! 提供分发层与传输层配置，支持 TOML 文件和 `VANE_*` 环境变量覆盖。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析配置文件失败: {0}")]
    Parse(String),

    /// 验证错误
    #[error("配置验证失败: {0}")]
    Validation(String),

    /// 环境变量错误
    #[error("环境变量解析失败: {0}")]
    EnvVar(String),
}

/// 配置 Result 类型
pub type Result<T> = std::result::Result<T, ConfigError>;

/// 分发策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 乱序：每个事件独立投递到共享线程池
    OutOfOrder,
    /// 有序：同一会话内 FIFO，不同会话并发
    Ordered,
}

/// 未捕获失败的处理策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncaughtPolicy {
    /// 记录 error 日志
    Log,
    /// 记录日志后终止进程
    Abort,
}

/// 提交被拒绝时传输层的处理策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// 丢弃事件
    Drop,
    /// 暂停读取该会话，退避后重试
    Throttle,
    /// 关闭该会话
    Escalate,
}

macro_rules! impl_str_enum {
    ($ty:ty, $($name:literal => $variant:path),+ $(,)?) => {
        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(ConfigError::Parse(format!(
                        "未知的 {} 取值: {}",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $($variant => $name,)+
                };
                f.write_str(name)
            }
        }
    };
}

impl_str_enum!(Strategy, "out_of_order" => Strategy::OutOfOrder, "ordered" => Strategy::Ordered);
impl_str_enum!(UncaughtPolicy, "log" => UncaughtPolicy::Log, "abort" => UncaughtPolicy::Abort);
impl_str_enum!(
    RejectionPolicy,
    "drop" => RejectionPolicy::Drop,
    "throttle" => RejectionPolicy::Throttle,
    "escalate" => RejectionPolicy::Escalate,
);

/// 分发层配置
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// 分发策略
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,

    /// 工作线程数量（None 表示使用 CPU 核心数）
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// 任务队列容量（None 表示无界，满时拒绝提交）
    ///
    /// 有序策略下同时限制每个会话等待中的事件数。
    #[serde(default)]
    pub queue_capacity: Option<usize>,

    /// 关闭时等待执行中回调的时间（毫秒）
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// 工作线程名前缀
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    /// 未捕获失败处理策略
    #[serde(default = "default_uncaught_policy")]
    pub uncaught_policy: UncaughtPolicy,
}

/// 传输层配置
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransportConfig {
    /// 绑定地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// 监听端口（0 表示由系统分配）
    #[serde(default = "default_port")]
    pub port: u16,

    /// 最大连接数限制
    #[serde(default)]
    pub max_connections: Option<u32>,

    /// 读空闲阈值（秒，None 表示不检测）
    #[serde(default = "default_read_idle_secs")]
    pub read_idle_secs: Option<u64>,

    /// 单行最大字节数，超出时会话以异常结束
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// 提交被拒绝时的处理策略
    #[serde(default = "default_rejection_policy")]
    pub rejection_policy: RejectionPolicy,

    /// 节流退避时间（毫秒）
    #[serde(default = "default_throttle_backoff_ms")]
    pub throttle_backoff_ms: u64,

    /// 节流重试次数
    #[serde(default = "default_throttle_retries")]
    pub throttle_retries: u32,
}

/// 完整配置
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VaneConfig {
    /// 分发层配置
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// 传输层配置
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            worker_threads: None,
            queue_capacity: None,
            shutdown_grace_ms: default_shutdown_grace_ms(),
            thread_name: default_thread_name(),
            uncaught_policy: default_uncaught_policy(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_connections: None,
            read_idle_secs: default_read_idle_secs(),
            max_line_length: default_max_line_length(),
            rejection_policy: default_rejection_policy(),
            throttle_backoff_ms: default_throttle_backoff_ms(),
            throttle_retries: default_throttle_retries(),
        }
    }
}

impl VaneConfig {
    /// 从 TOML 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 从文件加载并应用环境变量覆盖
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file(path)?.load_with_env_override()
    }

    /// 从环境变量加载配置并覆盖
    ///
    /// 支持的环境变量：
    /// - VANE_STRATEGY: out_of_order / ordered
    /// - VANE_WORKER_THREADS: 工作线程数
    /// - VANE_QUEUE_CAPACITY: 任务队列容量
    /// - VANE_SHUTDOWN_GRACE_MS: 关闭等待时间
    /// - VANE_UNCAUGHT_POLICY: log / abort
    /// - VANE_BIND_ADDRESS: 绑定地址
    /// - VANE_PORT: 端口
    /// - VANE_MAX_CONNECTIONS: 最大连接数
    /// - VANE_READ_IDLE_SECS: 读空闲阈值
    /// - VANE_MAX_LINE_LENGTH: 单行最大字节数
    /// - VANE_REJECTION_POLICY: drop / throttle / escalate
    /// - VANE_THROTTLE_BACKOFF_MS: 节流退避时间
    /// - VANE_THROTTLE_RETRIES: 节流重试次数
    pub fn load_with_env_override(self) -> Result<Self> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// 使用给定的查找函数应用覆盖
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("VANE_STRATEGY") {
            self.dispatch.strategy = v
                .parse()
                .map_err(|_| ConfigError::EnvVar("VANE_STRATEGY 必须是 out_of_order 或 ordered".to_string()))?;
        }

        if let Some(v) = lookup("VANE_WORKER_THREADS") {
            self.dispatch.worker_threads = Some(parse_env("VANE_WORKER_THREADS", &v)?);
        }

        if let Some(v) = lookup("VANE_QUEUE_CAPACITY") {
            self.dispatch.queue_capacity = Some(parse_env("VANE_QUEUE_CAPACITY", &v)?);
        }

        if let Some(v) = lookup("VANE_SHUTDOWN_GRACE_MS") {
            self.dispatch.shutdown_grace_ms = parse_env("VANE_SHUTDOWN_GRACE_MS", &v)?;
        }

        if let Some(v) = lookup("VANE_UNCAUGHT_POLICY") {
            self.dispatch.uncaught_policy = v
                .parse()
                .map_err(|_| ConfigError::EnvVar("VANE_UNCAUGHT_POLICY 必须是 log 或 abort".to_string()))?;
        }

        if let Some(v) = lookup("VANE_BIND_ADDRESS") {
            self.transport.bind_address = v;
        }

        if let Some(v) = lookup("VANE_PORT") {
            self.transport.port = parse_env("VANE_PORT", &v)?;
        }

        if let Some(v) = lookup("VANE_MAX_CONNECTIONS") {
            self.transport.max_connections = Some(parse_env("VANE_MAX_CONNECTIONS", &v)?);
        }

        if let Some(v) = lookup("VANE_READ_IDLE_SECS") {
            self.transport.read_idle_secs = Some(parse_env("VANE_READ_IDLE_SECS", &v)?);
        }

        if let Some(v) = lookup("VANE_MAX_LINE_LENGTH") {
            self.transport.max_line_length = parse_env("VANE_MAX_LINE_LENGTH", &v)?;
        }

        if let Some(v) = lookup("VANE_REJECTION_POLICY") {
            self.transport.rejection_policy = v.parse().map_err(|_| {
                ConfigError::EnvVar("VANE_REJECTION_POLICY 必须是 drop、throttle 或 escalate".to_string())
            })?;
        }

        if let Some(v) = lookup("VANE_THROTTLE_BACKOFF_MS") {
            self.transport.throttle_backoff_ms = parse_env("VANE_THROTTLE_BACKOFF_MS", &v)?;
        }

        if let Some(v) = lookup("VANE_THROTTLE_RETRIES") {
            self.transport.throttle_retries = parse_env("VANE_THROTTLE_RETRIES", &v)?;
        }

        Ok(self)
    }

    /// 验证配置是否有效
    pub fn validate(&self) -> Result<()> {
        self.dispatch.validate()?;
        self.transport.validate()
    }
}

impl DispatchConfig {
    /// 验证配置是否有效
    pub fn validate(&self) -> Result<()> {
        if let Some(threads) = self.worker_threads {
            if threads == 0 {
                return Err(ConfigError::Validation("工作线程数不能为 0".to_string()));
            }
            if threads > 512 {
                return Err(ConfigError::Validation("工作线程数过大 (建议 <= 512)".to_string()));
            }
        }

        if self.queue_capacity == Some(0) {
            return Err(ConfigError::Validation("任务队列容量不能为 0".to_string()));
        }

        if self.thread_name.is_empty() {
            return Err(ConfigError::Validation("工作线程名前缀不能为空".to_string()));
        }

        Ok(())
    }

    /// 关闭时等待执行中回调的时长
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// 获取配置摘要信息
    pub fn summary(&self) -> String {
        format!(
            "Vane 分发配置:\n  策略: {}\n  工作线程: {:?}\n  队列容量: {:?}\n  关闭等待: {}ms\n  未捕获失败: {}",
            self.strategy,
            self.worker_threads,
            self.queue_capacity,
            self.shutdown_grace_ms,
            self.uncaught_policy
        )
    }
}

impl TransportConfig {
    /// 验证配置是否有效
    pub fn validate(&self) -> Result<()> {
        if self.bind_address.is_empty() {
            return Err(ConfigError::Validation("绑定地址不能为空".to_string()));
        }

        if self.max_connections == Some(0) {
            return Err(ConfigError::Validation("最大连接数不能为 0".to_string()));
        }

        if self.read_idle_secs == Some(0) {
            return Err(ConfigError::Validation("读空闲阈值不能为 0".to_string()));
        }

        if self.max_line_length == 0 {
            return Err(ConfigError::Validation("单行最大长度不能为 0".to_string()));
        }

        if self.rejection_policy == RejectionPolicy::Throttle && self.throttle_backoff_ms == 0 {
            return Err(ConfigError::Validation("节流策略下退避时间不能为 0".to_string()));
        }

        Ok(())
    }

    /// 获取完整的绑定地址字符串
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// 获取配置摘要信息
    pub fn summary(&self) -> String {
        format!(
            "Vane 传输配置:\n  地址: {}\n  最大连接数: {:?}\n  读空闲: {:?}s\n  单行上限: {} 字节\n  拒绝策略: {}",
            self.bind_addr(),
            self.max_connections,
            self.read_idle_secs,
            self.max_line_length,
            self.rejection_policy
        )
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVar(format!("{} 的取值无效: {}", key, value)))
}

// 默认值函数
fn default_strategy() -> Strategy {
    Strategy::Ordered
}

fn default_shutdown_grace_ms() -> u64 {
    5_000
}

fn default_thread_name() -> String {
    "vane-worker".to_string()
}

fn default_uncaught_policy() -> UncaughtPolicy {
    UncaughtPolicy::Log
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_read_idle_secs() -> Option<u64> {
    Some(60)
}

fn default_max_line_length() -> usize {
    64 * 1024
}

fn default_rejection_policy() -> RejectionPolicy {
    RejectionPolicy::Throttle
}

fn default_throttle_backoff_ms() -> u64 {
    10
}

fn default_throttle_retries() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = VaneConfig::default();
        assert_eq!(config.dispatch.strategy, Strategy::Ordered);
        assert_eq!(config.transport.port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bind_addr() {
        let config = TransportConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 9000,
            ..Default::default()
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_validate_invalid_worker_threads() {
        let config = DispatchConfig {
            worker_threads: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DispatchConfig {
            worker_threads: Some(1000),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_queue_capacity() {
        let config = DispatchConfig {
            queue_capacity: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_transport() {
        let config = TransportConfig {
            bind_address: "".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TransportConfig {
            max_connections: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TransportConfig {
            read_idle_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TransportConfig {
            max_line_length: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_throttle_backoff() {
        let config = TransportConfig {
            rejection_policy: RejectionPolicy::Throttle,
            throttle_backoff_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        // 其他策略不使用退避时间
        let config = TransportConfig {
            rejection_policy: RejectionPolicy::Drop,
            throttle_backoff_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = VaneConfig::from_toml_str(
            r#"
            [dispatch]
            strategy = "out_of_order"
            worker_threads = 4
            queue_capacity = 128

            [transport]
            port = 9100
            rejection_policy = "escalate"
            "#,
        )
        .unwrap();

        assert_eq!(config.dispatch.strategy, Strategy::OutOfOrder);
        assert_eq!(config.dispatch.worker_threads, Some(4));
        assert_eq!(config.dispatch.queue_capacity, Some(128));
        assert_eq!(config.dispatch.shutdown_grace_ms, 5_000);
        assert_eq!(config.transport.port, 9100);
        assert_eq!(config.transport.rejection_policy, RejectionPolicy::Escalate);
        assert_eq!(config.transport.read_idle_secs, Some(60));
    }

    #[test]
    fn test_from_toml_invalid() {
        let result = VaneConfig::from_toml_str("[dispatch]\nstrategy = \"random\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_override() {
        let config = VaneConfig::default()
            .apply_env(env(&[
                ("VANE_STRATEGY", "out_of_order"),
                ("VANE_WORKER_THREADS", "8"),
                ("VANE_PORT", "9999"),
                ("VANE_REJECTION_POLICY", "drop"),
                ("VANE_UNCAUGHT_POLICY", "abort"),
                ("VANE_MAX_LINE_LENGTH", "1024"),
                ("VANE_THROTTLE_BACKOFF_MS", "50"),
                ("VANE_THROTTLE_RETRIES", "2"),
            ]))
            .unwrap();

        assert_eq!(config.dispatch.strategy, Strategy::OutOfOrder);
        assert_eq!(config.dispatch.worker_threads, Some(8));
        assert_eq!(config.dispatch.uncaught_policy, UncaughtPolicy::Abort);
        assert_eq!(config.transport.port, 9999);
        assert_eq!(config.transport.rejection_policy, RejectionPolicy::Drop);
        assert_eq!(config.transport.max_line_length, 1024);
        assert_eq!(config.transport.throttle_backoff_ms, 50);
        assert_eq!(config.transport.throttle_retries, 2);
    }

    #[test]
    fn test_env_override_invalid() {
        let result = VaneConfig::default().apply_env(env(&[("VANE_PORT", "invalid")]));
        assert!(matches!(result, Err(ConfigError::EnvVar(_))));

        let result = VaneConfig::default().apply_env(env(&[("VANE_STRATEGY", "fifo")]));
        assert!(matches!(result, Err(ConfigError::EnvVar(_))));

        let result = VaneConfig::default().apply_env(env(&[("VANE_THROTTLE_RETRIES", "-1")]));
        assert!(matches!(result, Err(ConfigError::EnvVar(_))));
    }

    #[test]
    fn test_strategy_display_roundtrip() {
        assert_eq!(Strategy::OutOfOrder.to_string(), "out_of_order");
        assert_eq!("Ordered".parse::<Strategy>().unwrap(), Strategy::Ordered);
    }

    #[test]
    fn test_config_summary() {
        let summary = DispatchConfig::default().summary();
        assert!(summary.contains("Vane 分发配置"));
        assert!(summary.contains("ordered"));

        let summary = TransportConfig::default().summary();
        assert!(summary.contains("0.0.0.0:8080"));
    }
}
