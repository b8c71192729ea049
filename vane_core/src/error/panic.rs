//! 回调 panic 的错误表示

use std::any::Any;
use thiserror::Error;

/// 处理器回调中发生的 panic
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("处理器 panic: {message}")]
pub struct PanicError {
    message: String,
}

impl PanicError {
    /// 从 `catch_unwind` 得到的 payload 构造
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_string()
        };
        Self { message }
    }

    /// panic 消息
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn test_from_str_payload() {
        let payload = panic::catch_unwind(|| panic!("boom")).unwrap_err();
        let err = PanicError::from_payload(payload);
        assert_eq!(err.message(), "boom");
        assert_eq!(err.to_string(), "处理器 panic: boom");
    }

    #[test]
    fn test_from_formatted_payload() {
        let payload = panic::catch_unwind(|| panic!("session {} failed", 9)).unwrap_err();
        assert_eq!(PanicError::from_payload(payload).message(), "session 9 failed");
    }

    #[test]
    fn test_from_opaque_payload() {
        let payload = panic::catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(
            PanicError::from_payload(payload).message(),
            "<non-string panic payload>"
        );
    }
}
