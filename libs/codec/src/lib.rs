//! # Message Switch Wire Codec
//!
//! Encoding and decoding rules for the fixed 36-byte frame exchanged
//! between members and the switch, plus the record type handed to the
//! log sink. Pure and stateless - no I/O lives in this crate.
//!
//! ## Frame layout
//!
//! All integer fields are little-endian, fixed for the whole system:
//!
//! | offset | size | field                                    |
//! |--------|------|------------------------------------------|
//! | 0      | 4    | packet_size (constant, always 32)        |
//! | 4      | 4    | mti - message type indicator, opaque     |
//! | 8      | 3    | src id (0 = anonymous)                   |
//! | 11     | 3    | dst id (0 = never routable)              |
//! | 14     | 1    | reply flag (repurposed trace byte)       |
//! | 15     | 5    | trace bytes, informational only          |
//! | 20     | 16   | pan - opaque payload, never interpreted  |

pub mod error;
pub mod frame;
pub mod record;

pub use error::CodecError;
pub use frame::{Frame, MemberId};
pub use record::LogRecord;

/// Total size of one wire frame in bytes.
pub const FRAME_SIZE: usize = 36;

/// Value of the leading packet_size field: everything after it.
pub const PAYLOAD_SIZE: u32 = 32;

/// Largest identity representable in the 3-byte id fields.
pub const MAX_MEMBER_ID: u32 = 0x00FF_FFFF;

/// Discriminant tag marking a queue record as a log record. The sink
/// ignores records carrying any other tag.
pub const LOG_RECORD_TAG: u32 = 123;

/// By convention a reply to message type M carries mti = M + 10.
pub const REPLY_MTI_OFFSET: u32 = 10;
