//! 在工作线程上执行一次事件投递，并实施失败策略

use crate::failure::{FailureSink, UncaughtFailure};
use crate::metrics::DispatchMetrics;
use std::sync::Arc;
use vane_core::{Event, EventKind, EventRouter, IoHandler, RouteFailure};

/// 两种策略共享的投递逻辑
pub(crate) struct EventRunner {
    router: EventRouter,
    failures: Arc<dyn FailureSink>,
    metrics: Arc<DispatchMetrics>,
}

impl EventRunner {
    pub(crate) fn new(failures: Arc<dyn FailureSink>, metrics: Arc<DispatchMetrics>) -> Self {
        Self {
            router: EventRouter::new(),
            failures,
            metrics,
        }
    }

    pub(crate) fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// 投递事件
    ///
    /// 回调失败时，在同一线程上把原始错误作为 `exception_caught` 投递给同一会话；
    /// `exception_caught` 自身或服务事件的失败上报到未捕获通道。
    pub(crate) fn run(&self, event: Event, handler: &dyn IoHandler) {
        tracing::trace!(
            event = %event.kind(),
            session = ?event.session().map(|s| s.id().value()),
            "投递事件"
        );

        let result = self.router.deliver(event, handler);
        self.metrics.record_delivered();

        if let Err(failure) = result {
            self.on_failure(failure, handler);
        }
    }

    fn on_failure(&self, failure: RouteFailure, handler: &dyn IoHandler) {
        if failure.kind == EventKind::ExceptionCaught {
            self.report_uncaught(failure);
            return;
        }

        let Some(session) = failure.session.clone() else {
            self.report_uncaught(failure);
            return;
        };

        self.metrics.record_handler_failure();
        tracing::debug!(
            event = %failure.kind,
            session = %session.id(),
            error = %failure.cause,
            "回调失败，转交 exception_caught"
        );

        let event = Event::exception_caught_with(session, failure.cause);
        if let Err(nested) = self.router.deliver(event, handler) {
            self.report_uncaught(nested);
        }
    }

    fn report_uncaught(&self, failure: RouteFailure) {
        self.metrics.record_uncaught_failure();
        self.failures.report(UncaughtFailure {
            kind: failure.kind,
            session: failure.session.map(|s| s.id()),
            cause: failure.cause,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vane_core::{
        Cause, HandlerResult, Message, Service, ServiceId, Session, SessionId, VaneError,
    };

    #[derive(Default)]
    struct Flaky {
        caught: Mutex<Vec<(SessionId, Cause)>>,
        fail_in_caught: bool,
    }

    impl IoHandler for Flaky {
        fn message_received(&self, _session: &Session, _message: Message) -> HandlerResult {
            Err(Box::new(VaneError::handler("decode")))
        }

        fn service_activated(&self, _service: &Service) -> HandlerResult {
            Err("bind".into())
        }

        fn exception_caught(&self, session: &Session, cause: Cause) -> HandlerResult {
            self.caught.lock().unwrap().push((session.id(), cause));
            if self.fail_in_caught {
                return Err("caught handler failed".into());
            }
            Ok(())
        }
    }

    fn runner() -> (EventRunner, Arc<Mutex<Vec<UncaughtFailure>>>) {
        let uncaught = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let uncaught = Arc::clone(&uncaught);
            move |f: UncaughtFailure| uncaught.lock().unwrap().push(f)
        };
        let runner = EventRunner::new(Arc::new(sink), Arc::new(DispatchMetrics::new()));
        (runner, uncaught)
    }

    #[test]
    fn test_failure_converted_to_exception_caught() {
        let (runner, uncaught) = runner();
        let handler = Flaky::default();
        let session = Session::new(SessionId::new(12));

        runner.run(Event::message_received(session, "x"), &handler);

        let caught = handler.caught.lock().unwrap();
        assert_eq!(caught.len(), 1);
        assert_eq!(caught[0].0, SessionId::new(12));
        assert_eq!(caught[0].1.to_string(), "处理器错误: decode");
        assert!(uncaught.lock().unwrap().is_empty());
        assert_eq!(runner.metrics().handler_failures(), 1);
        assert_eq!(runner.metrics().delivered(), 1);
    }

    #[test]
    fn test_exception_caught_failure_not_recursed() {
        let (runner, uncaught) = runner();
        let handler = Flaky {
            fail_in_caught: true,
            ..Default::default()
        };

        runner.run(
            Event::message_received(Session::new(SessionId::new(1)), "x"),
            &handler,
        );

        assert_eq!(handler.caught.lock().unwrap().len(), 1);
        let uncaught = uncaught.lock().unwrap();
        assert_eq!(uncaught.len(), 1);
        assert_eq!(uncaught[0].kind, EventKind::ExceptionCaught);
        assert_eq!(uncaught[0].session, Some(SessionId::new(1)));
        assert_eq!(runner.metrics().uncaught_failures(), 1);
    }

    #[test]
    fn test_service_failure_reported_uncaught() {
        let (runner, uncaught) = runner();
        let handler = Flaky::default();

        runner.run(
            Event::service_activated(Service::new(ServiceId::new(1), "svc")),
            &handler,
        );

        assert!(handler.caught.lock().unwrap().is_empty());
        let uncaught = uncaught.lock().unwrap();
        assert_eq!(uncaught.len(), 1);
        assert_eq!(uncaught[0].kind, EventKind::ServiceActivated);
        assert!(uncaught[0].session.is_none());
    }
}
