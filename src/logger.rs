//! A minimal async logger, adapted from this crate's lineage: a bounded
//! `mpsc` channel feeding a background task, so lock retries and backend
//! selection can be traced without making every caller pull in `log` or
//! `tracing`. A crate consumer who never calls [`init`] still gets a
//! harmless no-op sink.

use chrono::Utc;
use std::fmt;
use std::sync::OnceLock;
use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

enum Record {
    Message { level: Level, msg: String, ts_millis: i64 },
    Shutdown,
}

/// A clone-cheap handle to the background logging task.
#[derive(Clone)]
pub struct Logger {
    tx: mpsc::Sender<Record>,
}

impl Logger {
    fn send(&self, level: Level, msg: String) {
        let ts_millis = Utc::now().timestamp_millis();
        if self.tx.try_send(Record::Message { level, msg, ts_millis }).is_err() {
            // Channel full or sink gone: logging is best-effort, never block callers.
        }
    }

    pub fn trace(&self, msg: impl Into<String>) {
        self.send(Level::Trace, msg.into());
    }
    pub fn debug(&self, msg: impl Into<String>) {
        self.send(Level::Debug, msg.into());
    }
    pub fn info(&self, msg: impl Into<String>) {
        self.send(Level::Info, msg.into());
    }
    pub fn warn(&self, msg: impl Into<String>) {
        self.send(Level::Warn, msg.into());
    }
    pub fn error(&self, msg: impl Into<String>) {
        self.send(Level::Error, msg.into());
    }
}

fn format_line(level: Level, msg: &str, ts_millis: i64) -> String {
    let dt = chrono::DateTime::from_timestamp_millis(ts_millis).unwrap_or_else(Utc::now);
    let ts = dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    format!("{} [{}] {}\n", ts, level, msg)
}

/// Install a logger that writes formatted lines to `sink`. Returns the
/// handle and the background task's `JoinHandle`; the task exits once every
/// `Logger` clone is dropped and the channel drains.
pub fn init<W>(mut sink: W) -> (Logger, tokio::task::JoinHandle<()>)
where
    W: std::io::Write + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Record>(1024);
    let task = tokio::task::spawn_blocking(move || {
        while let Some(rec) = rx.blocking_recv() {
            match rec {
                Record::Message { level, msg, ts_millis } => {
                    let _ = sink.write_all(format_line(level, &msg, ts_millis).as_bytes());
                    let _ = sink.flush();
                }
                Record::Shutdown => break,
            }
        }
    });
    (Logger { tx }, task)
}

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Install `logger` as the process-wide default used by [`global`].
/// A second call is a no-op: the first logger installed wins.
pub fn set_global(logger: Logger) {
    let _ = GLOBAL.set(logger);
}

/// The process-wide logger, or a no-op sink if [`set_global`] was never called.
pub fn global() -> Logger {
    GLOBAL
        .get_or_init(|| {
            // No-op sink: a channel with no live receiver. try_send will fail
            // silently forever, which is exactly the "didn't opt in" behavior
            // we want.
            let (tx, rx) = mpsc::channel(1);
            drop(rx);
            Logger { tx }
        })
        .clone()
}
