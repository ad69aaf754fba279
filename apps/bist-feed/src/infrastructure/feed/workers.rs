//! Type-Scoped Worker Queues
//!
//! One unbounded queue and one tokio task per [`QueueKind`]. The router
//! enqueues without blocking; each worker decodes its items one at a time in
//! submission order and publishes the result on the [`EventHub`].
//!
//! # Failure isolation
//!
//! A decoder `Err` becomes a warning-level log event. A decoder panic is
//! caught at the worker boundary and becomes an error-level log event. In
//! both cases the worker moves on to the next item.
//!
//! # Shutdown
//!
//! With `drain = true` the senders are dropped and each worker finishes the
//! items already queued. With `drain = false` pending items are discarded.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::decoders::{self, DecodeError, Decoded, DecoderContext};
use super::protocol::{FeedLine, QueueKind};
use crate::infrastructure::broadcast::{EventHub, LogLevel, SharedEventHub};
use crate::infrastructure::metrics;

/// Decode function run by every worker.
pub type DecodeFn = fn(&DecoderContext, &FeedLine) -> Result<Decoded, DecodeError>;

/// Pool of per-type workers.
pub struct WorkerPool {
    senders: RwLock<Option<Vec<mpsc::UnboundedSender<FeedLine>>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawn one worker per queue using the standard decoders.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn start(ctx: DecoderContext, events: SharedEventHub) -> Self {
        Self::start_with(ctx, events, decoders::decode)
    }

    /// Spawn one worker per queue using `decode`.
    #[must_use]
    pub fn start_with(ctx: DecoderContext, events: SharedEventHub, decode: DecodeFn) -> Self {
        let cancel = CancellationToken::new();
        let mut senders = Vec::with_capacity(QueueKind::ALL.len());
        let mut handles = Vec::with_capacity(QueueKind::ALL.len());

        for kind in QueueKind::ALL {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            handles.push(tokio::spawn(run_worker(
                kind,
                rx,
                ctx.clone(),
                Arc::clone(&events),
                decode,
                cancel.clone(),
            )));
        }

        tracing::debug!(workers = handles.len(), "Worker pool started");

        Self {
            senders: RwLock::new(Some(senders)),
            handles: Mutex::new(handles),
            cancel,
        }
    }

    /// Enqueue a line on a queue.
    ///
    /// Returns `false` once the pool has been shut down.
    pub fn dispatch(&self, kind: QueueKind, line: FeedLine) -> bool {
        self.senders
            .read()
            .as_ref()
            .and_then(|senders| senders.get(kind.index()))
            .is_some_and(|tx| tx.send(line).is_ok())
    }

    /// Whether the pool still accepts work.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.senders.read().is_some()
    }

    /// Stop accepting work and wait for every worker to exit.
    ///
    /// With `drain` the workers process everything already queued first;
    /// without it pending items are dropped. Calling this twice is a no-op.
    pub async fn shutdown(&self, drain: bool) {
        let Some(senders) = self.senders.write().take() else {
            return;
        };
        if !drain {
            self.cancel.cancel();
        }
        drop(senders);

        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task failed");
            }
        }

        tracing::info!(drain, "Worker pool stopped");
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn run_worker(
    kind: QueueKind,
    mut rx: mpsc::UnboundedReceiver<FeedLine>,
    ctx: DecoderContext,
    events: SharedEventHub,
    decode: DecodeFn,
    cancel: CancellationToken,
) {
    tracing::debug!(queue = kind.as_str(), "Worker started");

    loop {
        let line = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            line = rx.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };
        process(kind, &ctx, &events, decode, &line);
    }

    tracing::debug!(queue = kind.as_str(), "Worker stopped");
}

fn process(
    kind: QueueKind,
    ctx: &DecoderContext,
    events: &EventHub,
    decode: DecodeFn,
    line: &FeedLine,
) {
    let started = Instant::now();

    match catch_unwind(AssertUnwindSafe(|| decode(ctx, line))) {
        Ok(Ok(decoded)) => {
            metrics::record_decoded(kind);
            publish(ctx, events, decoded, Arc::clone(&line.raw));
        }
        Ok(Err(e)) => {
            tracing::warn!(
                queue = kind.as_str(),
                message_type = line.message_type.as_str(),
                raw = %line.raw,
                error = %e,
                "Line rejected"
            );
            metrics::record_rejected(kind);
            let _ = events.send_log(
                LogLevel::Warning,
                Some(kind),
                e.to_string(),
                Some(Arc::clone(&line.raw)),
            );
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(
                queue = kind.as_str(),
                raw = %line.raw,
                panic = %message,
                "Decoder panicked"
            );
            metrics::record_decoder_panic(kind);
            let _ = events.send_log(
                LogLevel::Error,
                Some(kind),
                format!("decoder panicked: {message}"),
                Some(Arc::clone(&line.raw)),
            );
        }
    }

    metrics::record_decode_duration(kind, started.elapsed());
}

fn publish(ctx: &DecoderContext, events: &EventHub, decoded: Decoded, raw: Arc<str>) {
    match decoded {
        Decoded::Security(security) => {
            let _ = events.send_security(*security, raw);
            metrics::set_securities(ctx.store.security_count());
        }
        Decoded::Depth {
            org_security,
            side,
            depth,
        } => {
            let _ = events.send_depth(org_security, side, depth, raw);
        }
        Decoded::SessionTime(time) => {
            let _ = events.send_session_time(time, raw);
        }
        Decoded::News(news) => {
            let _ = events.send_news(news, raw);
        }
        Decoded::Unknown(reason) => {
            tracing::debug!(reason = ?reason, raw = %raw, "Unknown feed line");
            let _ = events.send_unknown(reason, raw);
        }
        Decoded::Ignored => {}
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::infrastructure::broadcast::EventHub;
    use crate::infrastructure::feed::decoders::test_support::{context, line};

    fn hub() -> SharedEventHub {
        Arc::new(EventHub::with_defaults())
    }

    #[tokio::test]
    async fn same_queue_keeps_submission_order() {
        let events = hub();
        let mut rx = events.securities_rx();
        let pool = WorkerPool::start(context(), Arc::clone(&events));

        for i in 0..50 {
            let value = format!("{i}");
            assert!(pool.dispatch(
                QueueKind::Update,
                line("060", &["AKBNK", "12", value.as_str()])
            ));
        }
        pool.shutdown(true).await;

        for i in 0..50 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.security.stats.volume, Some(i));
        }
    }

    #[tokio::test]
    async fn rejected_line_publishes_one_log_event() {
        let events = hub();
        let mut logs = events.log_rx();
        let mut securities = events.securities_rx();
        let ctx = context();
        let store = Arc::clone(&ctx.store);
        let pool = WorkerPool::start(ctx, Arc::clone(&events));

        let bad = line("001", &["AKBNK", "1"]);
        let raw = Arc::clone(&bad.raw);
        pool.dispatch(QueueKind::Create, bad);
        pool.shutdown(true).await;

        let log = logs.recv().await.unwrap();
        assert_eq!(log.level, LogLevel::Warning);
        assert_eq!(log.queue, Some(QueueKind::Create));
        assert_eq!(log.raw, Some(raw));
        assert!(matches!(logs.try_recv(), Err(TryRecvError::Empty)));
        assert!(matches!(securities.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(store.security_count(), 0);
    }

    fn panicking_decode(ctx: &DecoderContext, line: &FeedLine) -> Result<Decoded, DecodeError> {
        assert!(!line.raw.contains("BOOM"), "decoder exploded");
        decoders::decode(ctx, line)
    }

    #[tokio::test]
    async fn panic_is_isolated_and_worker_continues() {
        let events = hub();
        let mut logs = events.log_rx();
        let mut securities = events.securities_rx();
        let pool = WorkerPool::start_with(context(), Arc::clone(&events), panicking_decode);

        pool.dispatch(QueueKind::Update, line("060", &["BOOM", "1", "1.0"]));
        pool.dispatch(QueueKind::Update, line("060", &["AKBNK", "1", "10.50"]));
        pool.shutdown(true).await;

        let log = logs.recv().await.unwrap();
        assert_eq!(log.level, LogLevel::Error);
        assert!(log.message.contains("decoder exploded"));

        let event = securities.recv().await.unwrap();
        assert_eq!(event.security.org_security, "AKBNK");
    }

    #[tokio::test]
    async fn unknown_lines_publish_unknown_events() {
        let events = hub();
        let mut unknown = events.unknown_rx();
        let pool = WorkerPool::start(context(), Arc::clone(&events));

        pool.dispatch(QueueKind::Unknown, FeedLine::classify("999SOMETHING\u{1F}X"));
        pool.shutdown(true).await;

        let event = unknown.recv().await.unwrap();
        assert_eq!(&*event.raw, "999SOMETHING\u{1F}X");
    }

    #[tokio::test]
    async fn news_delete_publishes_nothing() {
        let events = hub();
        let mut news = events.news_rx();
        let mut logs = events.log_rx();
        let pool = WorkerPool::start(context(), Arc::clone(&events));

        pool.dispatch(QueueKind::News, line("022", &["N1001", "", ""]));
        pool.shutdown(true).await;

        assert!(matches!(news.try_recv(), Err(TryRecvError::Empty)));
        assert!(matches!(logs.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn dispatch_after_shutdown_is_refused() {
        let pool = WorkerPool::start(context(), hub());
        assert!(pool.is_running());

        pool.shutdown(false).await;
        pool.shutdown(false).await;

        assert!(!pool.is_running());
        assert!(!pool.dispatch(QueueKind::Create, line("002", &["AKBNK", "1", ""])));
    }

    #[tokio::test]
    async fn discard_shutdown_returns_promptly() {
        let pool = WorkerPool::start(context(), hub());
        for _ in 0..1_000 {
            pool.dispatch(
                QueueKind::Depth,
                line("064", &["AKBNK", "0", "1", "1", "1", "1", "", "5", ""]),
            );
        }

        tokio::time::timeout(Duration::from_secs(5), pool.shutdown(false))
            .await
            .unwrap();
    }
}
