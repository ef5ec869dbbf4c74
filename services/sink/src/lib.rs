//! # Log Sink
//!
//! The durable side of the switch's audit trail. The switch pushes a
//! [`LogRecord`] onto a bounded FIFO queue for every frame it
//! successfully forwards; the sink is an isolated unit that drains
//! that queue and appends one human-readable line per record.
//!
//! The queue is a real channel abstraction rather than shared memory,
//! so the sink can run as a task, a thread, or a separate service
//! without code change. Ordering is per-producer: the switch is a
//! single producer, so the log preserves global forward order.
//!
//! The sink never interprets or filters content beyond the record tag
//! check - it is a pure appender.

use std::fmt::Write as _;
use std::path::Path;

use codec::{Frame, LogRecord};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Default log file name, opened for truncation at sink startup.
pub const DEFAULT_LOG_FILE: &str = "messages.msg";

/// Default bound of the record queue between switch and sink.
pub const DEFAULT_QUEUE_DEPTH: usize = 1024;

/// Sending half of the record queue, held by the switch.
pub type RecordSender = mpsc::Sender<LogRecord>;

/// Receiving half of the record queue, owned by the sink.
pub type RecordReceiver = mpsc::Receiver<LogRecord>;

/// Errors from the sink's drain loop.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("log write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Create the bounded FIFO queue connecting the switch to the sink.
pub fn record_queue(depth: usize) -> (RecordSender, RecordReceiver) {
    mpsc::channel(depth)
}

/// Open (and truncate) the sink's log file.
pub async fn open_log(path: impl AsRef<Path>) -> std::io::Result<File> {
    File::create(path).await
}

/// Drains the record queue and appends one line per log record.
pub struct Sink<W> {
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> Sink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Drain records until the queue closes (the switch dropping its
    /// sender is the shutdown signal). Records with a foreign tag are
    /// skipped. Returns the number of lines written.
    pub async fn run(mut self, mut rx: RecordReceiver) -> Result<u64, SinkError> {
        let mut written = 0u64;

        while let Some(record) = rx.recv().await {
            if !record.is_log_record() {
                debug!(tag = record.tag, "skipping record with foreign tag");
                continue;
            }

            let frame = Frame::from_bytes(&record.frame);
            self.writer.write_all(format_record(&frame).as_bytes()).await?;
            // One durable line per record, never a partial batch.
            self.writer.flush().await?;
            written += 1;
        }

        info!(records = written, "record queue closed, sink stopping");
        Ok(written)
    }
}

/// Render one log line for a forwarded frame.
///
/// Layout: direction, destination, mti and source in prose, then the
/// decimal-padded src id, mti, raw trace bytes, pan bytes and dst id.
pub fn format_record(frame: &Frame) -> String {
    let direction = if frame.is_reply() { "Reply" } else { "Request" };

    let mut line = format!(
        "{} message:\tmember({}) received {} from member({})\t",
        direction, frame.dst, frame.mti, frame.src
    );

    let _ = write!(line, "{:03}", frame.src);
    let _ = write!(line, "{:04}", frame.mti);
    let _ = write!(line, "{}", frame.reply);
    for b in frame.trace {
        let _ = write!(line, "{}", b);
    }
    for b in frame.pan {
        let _ = write!(line, "{}", b);
    }
    let _ = write!(line, "{:03}", frame.dst);
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::LOG_RECORD_TAG;

    #[test]
    fn request_line_layout() {
        let frame = Frame::request(200, 5, 7);
        let line = format_record(&frame);
        let expected = concat!(
            "Request message:\tmember(7) received 200 from member(5)\t",
            "005",              // padded src
            "0200",             // padded mti
            "0",                // reply byte
            "23456",            // trace bytes
            "1111111111111111", // pan bytes
            "007",              // padded dst
            "\n"
        );
        assert_eq!(line, expected);
    }

    #[test]
    fn reply_line_layout() {
        let frame = Frame::request(200, 5, 7).reply_to();
        let line = format_record(&frame);
        assert!(line.starts_with("Reply message:\tmember(5) received 210 from member(7)\t"));
        assert!(line.ends_with("005\n"));
    }

    #[tokio::test]
    async fn drains_queue_in_order_and_skips_foreign_tags() {
        let (tx, rx) = record_queue(8);

        tx.send(LogRecord::new(Frame::request(1, 10, 20).encode()))
            .await
            .unwrap();
        tx.send(LogRecord {
            tag: LOG_RECORD_TAG + 1,
            frame: Frame::request(99, 1, 2).encode(),
        })
        .await
        .unwrap();
        tx.send(LogRecord::new(Frame::request(2, 20, 10).encode()))
            .await
            .unwrap();
        drop(tx);

        let mut out = Vec::new();
        let written = Sink::new(&mut out).run(rx).await.unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("member(20) received 1 from member(10)"));
        assert!(lines[1].contains("member(10) received 2 from member(20)"));
    }

    #[tokio::test]
    async fn log_file_is_truncated_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_LOG_FILE);
        tokio::fs::write(&path, b"stale contents\n").await.unwrap();

        let file = open_log(&path).await.unwrap();
        let (tx, rx) = record_queue(1);
        tx.send(LogRecord::new(Frame::request(3, 1, 2).encode()))
            .await
            .unwrap();
        drop(tx);

        Sink::new(file).run(rx).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(!text.contains("stale"));
        assert!(text.starts_with("Request message:"));
    }
}
