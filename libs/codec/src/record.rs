//! Queue record handed from the switch to the log sink.
//!
//! The sink boundary is a bounded FIFO channel of these records. The
//! tag discriminates log records from anything else that might share
//! the queue; the sink drops records with a foreign tag on the floor.

use crate::{FRAME_SIZE, LOG_RECORD_TAG};

/// One cross-boundary queue record: a discriminant tag plus a verbatim
/// copy of the routed wire frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecord {
    /// Record discriminant; only [`LOG_RECORD_TAG`] records are logged.
    pub tag: u32,
    /// The forwarded frame, byte-for-byte as it went to the recipient.
    pub frame: [u8; FRAME_SIZE],
}

impl LogRecord {
    /// A log record for a frame that was just forwarded.
    pub fn new(frame: [u8; FRAME_SIZE]) -> Self {
        Self {
            tag: LOG_RECORD_TAG,
            frame,
        }
    }

    /// Whether the sink should persist this record.
    pub fn is_log_record(&self) -> bool {
        self.tag == LOG_RECORD_TAG
    }
}
