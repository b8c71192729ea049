//! Vane 框架核心错误类型

use super::context::ErrorContext;
use std::io;
use thiserror::Error;

/// Vane 框架核心错误类型
#[derive(Error, Debug)]
pub enum VaneError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 分发错误（提交被拒绝、线程池不可用）
    #[error("分发错误: {0}")]
    Dispatch(String),

    /// 处理器错误
    #[error("处理器错误: {0}")]
    Handler(String),

    /// 传输层错误
    #[error("传输错误: {0}")]
    Transport(String),

    /// 超时错误
    #[error("操作超时")]
    Timeout,

    /// 验证错误
    #[error("验证失败: {0}")]
    Validation(String),

    /// 带上下文的错误
    #[error("{0} ({1})")]
    WithContext(#[source] Box<VaneError>, ErrorContext),
}

impl VaneError {
    /// 获取错误类型
    pub fn kind(&self) -> VaneErrorKind {
        match self {
            VaneError::Io(_) => VaneErrorKind::Io,
            VaneError::Config(_) => VaneErrorKind::Config,
            VaneError::Dispatch(_) => VaneErrorKind::Dispatch,
            VaneError::Handler(_) => VaneErrorKind::Handler,
            VaneError::Transport(_) => VaneErrorKind::Transport,
            VaneError::Timeout => VaneErrorKind::Timeout,
            VaneError::Validation(_) => VaneErrorKind::Validation,
            VaneError::WithContext(inner, _) => inner.kind(),
        }
    }

    /// 添加上下文信息
    pub fn with_context<C>(self, context: C) -> Self
    where
        C: Into<ErrorContext>,
    {
        VaneError::WithContext(Box::new(self), context.into())
    }

    /// 创建配置错误
    pub fn config(msg: impl Into<String>) -> Self {
        VaneError::Config(msg.into())
    }

    /// 创建分发错误
    pub fn dispatch(msg: impl Into<String>) -> Self {
        VaneError::Dispatch(msg.into())
    }

    /// 创建处理器错误
    pub fn handler(msg: impl Into<String>) -> Self {
        VaneError::Handler(msg.into())
    }

    /// 创建传输错误
    pub fn transport(msg: impl Into<String>) -> Self {
        VaneError::Transport(msg.into())
    }

    /// 创建超时错误
    pub fn timeout() -> Self {
        VaneError::Timeout
    }

    /// 创建验证错误
    pub fn validation(msg: impl Into<String>) -> Self {
        VaneError::Validation(msg.into())
    }
}

/// 错误类型分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VaneErrorKind {
    /// IO 错误
    Io,
    /// 配置错误
    Config,
    /// 分发错误
    Dispatch,
    /// 处理器错误
    Handler,
    /// 传输错误
    Transport,
    /// 超时错误
    Timeout,
    /// 验证错误
    Validation,
}
