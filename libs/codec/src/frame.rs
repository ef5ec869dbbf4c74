//! The fixed 36-byte wire frame.
//!
//! `Frame` is the decoded view the router operates on. Encode and
//! decode are explicit byte-buffer operations - the wire layout is
//! never derived from the in-memory struct layout, so the format is
//! identical on every platform.
//!
//! Encode and decode are inverse bijections: `decode(encode(f)) == f`
//! for every frame, and `encode(decode(b)) == b` for every 36-byte
//! buffer. The reply flag is kept as the raw trace byte (non-zero
//! means reply) so forwarded frames survive bit-for-bit.

use crate::error::{CodecError, CodecResult};
use crate::{FRAME_SIZE, MAX_MEMBER_ID, PAYLOAD_SIZE, REPLY_MTI_OFFSET};

/// Numeric identity a member claims as its source id. Only the low
/// 24 bits travel on the wire; 0 means anonymous (as a source) or
/// unroutable broadcast (as a destination).
pub type MemberId = u32;

/// Decoded view of one wire frame.
///
/// The router reads only the addressing fields (`src`, `dst`) and the
/// reply flag; `mti`, `trace` and `pan` pass through opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Message type indicator, application-defined opaque code.
    pub mti: u32,
    /// Sender identity, 24-bit.
    pub src: MemberId,
    /// Recipient identity, 24-bit. 0 is never routable.
    pub dst: MemberId,
    /// Raw reply byte: 0 = request, non-zero = reply.
    pub reply: u8,
    /// Trace bytes, informational only.
    pub trace: [u8; 5],
    /// Opaque payload, echoed untouched.
    pub pan: [u8; 16],
}

impl Frame {
    /// A request frame with the conventional constant trace/pan fill.
    pub fn request(mti: u32, src: MemberId, dst: MemberId) -> Self {
        Self {
            mti,
            src: src & MAX_MEMBER_ID,
            dst: dst & MAX_MEMBER_ID,
            reply: 0,
            trace: [2, 3, 4, 5, 6],
            pan: [1; 16],
        }
    }

    /// The conventional reply to this frame: mti bumped by the reply
    /// offset, source and destination swapped, reply flag set. The
    /// payload is echoed back verbatim.
    pub fn reply_to(&self) -> Self {
        Self {
            mti: self.mti.wrapping_add(REPLY_MTI_OFFSET),
            src: self.dst,
            dst: self.src,
            reply: 1,
            trace: self.trace,
            pan: self.pan,
        }
    }

    /// Whether the reply flag is set.
    pub fn is_reply(&self) -> bool {
        self.reply != 0
    }

    /// Encode into one wire frame. Ids wider than 24 bits are masked.
    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let mut buf = [0u8; FRAME_SIZE];
        buf[0..4].copy_from_slice(&PAYLOAD_SIZE.to_le_bytes());
        buf[4..8].copy_from_slice(&self.mti.to_le_bytes());
        buf[8..11].copy_from_slice(&(self.src & MAX_MEMBER_ID).to_le_bytes()[..3]);
        buf[11..14].copy_from_slice(&(self.dst & MAX_MEMBER_ID).to_le_bytes()[..3]);
        buf[14] = self.reply;
        buf[15..20].copy_from_slice(&self.trace);
        buf[20..36].copy_from_slice(&self.pan);
        buf
    }

    /// Decode one wire frame. Total for any 36-byte input: the only
    /// possible error is a buffer of the wrong length.
    pub fn decode(buf: &[u8]) -> CodecResult<Self> {
        let exact: &[u8; FRAME_SIZE] =
            buf.try_into().map_err(|_| CodecError::InvalidLength {
                expected: FRAME_SIZE,
                actual: buf.len(),
            })?;
        Ok(Self::from_bytes(exact))
    }

    /// Decode a frame whose size is already established. Infallible:
    /// unrecognized mti values, zero ids and arbitrary payload bytes
    /// are all legal, and the incoming packet_size field is not
    /// validated - framing is enforced by the fixed read granularity,
    /// never by frame content.
    pub fn from_bytes(buf: &[u8; FRAME_SIZE]) -> Self {
        let mut mti = [0u8; 4];
        mti.copy_from_slice(&buf[4..8]);

        let mut trace = [0u8; 5];
        trace.copy_from_slice(&buf[15..20]);
        let mut pan = [0u8; 16];
        pan.copy_from_slice(&buf[20..36]);

        Self {
            mti: u32::from_le_bytes(mti),
            src: id_from_bytes(&buf[8..11]),
            dst: id_from_bytes(&buf[11..14]),
            reply: buf[14],
            trace,
            pan,
        }
    }
}

fn id_from_bytes(b: &[u8]) -> MemberId {
    u32::from_le_bytes([b[0], b[1], b[2], 0])
}
