//! 会话读取任务
//!
//! 每个连接一个任务：按行解码，把观察到的状况构造成事件提交给执行器。

use crate::connection::ConnectionGuard;
use crate::submit::{Outcome, Submitter};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use vane_core::{Event, IdleStatus, Session};

/// 一次读取的结果
enum Read {
    Line(String),
    Idle,
    Failed(LinesCodecError),
    Eof,
}

async fn next_read(
    frames: &mut FramedRead<TcpStream, LinesCodec>,
    read_idle: Option<Duration>,
) -> Read {
    let next = match read_idle {
        Some(idle) => match tokio::time::timeout(idle, frames.next()).await {
            Ok(next) => next,
            Err(_) => return Read::Idle,
        },
        None => frames.next().await,
    };

    match next {
        Some(Ok(line)) => Read::Line(line),
        Some(Err(e)) => Read::Failed(e),
        None => Read::Eof,
    }
}

/// 运行会话直到连接结束、出错、被升级关闭或服务停止
///
/// 无论以何种方式结束，最后都会提交 `SessionClosed`。超过 `max_line_length`
/// 的行按解码失败处理。
pub(crate) async fn serve(
    stream: TcpStream,
    session: Session,
    submitter: Submitter,
    read_idle: Option<Duration>,
    max_line_length: usize,
    mut closing: watch::Receiver<bool>,
    _guard: ConnectionGuard,
) {
    tracing::debug!(session = %session, "会话打开");
    let mut frames = FramedRead::new(stream, LinesCodec::new_with_max_length(max_line_length));

    let mut outcome = submitter.submit(Event::session_opened(session.clone())).await;

    loop {
        let stopping = *closing.borrow();
        if stopping || outcome == Outcome::Escalated {
            break;
        }

        let read = tokio::select! {
            _ = closing.changed() => break,
            read = next_read(&mut frames, read_idle) => read,
        };

        outcome = match read {
            Read::Line(line) => {
                submitter
                    .submit(Event::message_received(session.clone(), line))
                    .await
            }
            Read::Idle => {
                submitter
                    .submit(Event::session_idle(session.clone(), IdleStatus::ReaderIdle))
                    .await
            }
            Read::Failed(e) => {
                tracing::debug!(session = %session, error = %e, "读取失败");
                submitter
                    .submit(Event::exception_caught(session.clone(), e))
                    .await;
                break;
            }
            Read::Eof => break,
        };
    }

    submitter.submit(Event::session_closed(session.clone())).await;
    tracing::debug!(session = %session, "会话关闭");
}
