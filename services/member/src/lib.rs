//! # Member Client
//!
//! Wire-contract client for the message switch. A member connects,
//! announces its identity with an mti 0 frame (which is how the
//! switch learns its route), then exchanges request/reply frames with
//! other members by id. Replies follow the mti + 10 convention with
//! the reply flag set.

use std::io;
use std::net::SocketAddr;

use codec::{Frame, MemberId, FRAME_SIZE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// A connected member, split into independent read and write halves
/// so inbound traffic can be awaited while requests are sent.
pub struct Member {
    reader: MemberReader,
    writer: MemberWriter,
}

impl Member {
    /// Connect to the switch and announce our identity. The announce
    /// frame (mti 0, dst 0) establishes this member's route without
    /// being routed anywhere itself.
    pub async fn connect(addr: SocketAddr, id: MemberId) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        let mut member = Self {
            reader: MemberReader { half: read_half, id },
            writer: MemberWriter { half: write_half, id },
        };
        member.writer.send_frame(&Frame::request(0, id, 0)).await?;
        Ok(member)
    }

    pub fn id(&self) -> MemberId {
        self.reader.id
    }

    pub fn split(self) -> (MemberReader, MemberWriter) {
        (self.reader, self.writer)
    }

    pub async fn send_request(&mut self, mti: u32, dst: MemberId) -> io::Result<()> {
        self.writer.send_request(mti, dst).await
    }

    pub async fn recv_frame(&mut self) -> io::Result<Option<Frame>> {
        self.reader.recv_frame().await
    }
}

/// Inbound half of a member connection.
pub struct MemberReader {
    half: OwnedReadHalf,
    id: MemberId,
}

impl MemberReader {
    pub fn id(&self) -> MemberId {
        self.id
    }

    /// Read the next whole frame off the stream. `Ok(None)` means the
    /// switch closed the connection.
    pub async fn recv_frame(&mut self) -> io::Result<Option<Frame>> {
        let mut buf = [0u8; FRAME_SIZE];
        match self.half.read_exact(&mut buf).await {
            Ok(_) => Ok(Some(Frame::from_bytes(&buf))),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Outbound half of a member connection.
pub struct MemberWriter {
    half: OwnedWriteHalf,
    id: MemberId,
}

impl MemberWriter {
    /// Send a request frame carrying `mti` to member `dst`.
    pub async fn send_request(&mut self, mti: u32, dst: MemberId) -> io::Result<()> {
        self.send_frame(&Frame::request(mti, self.id, dst)).await
    }

    pub async fn send_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.half.write_all(&frame.encode()).await
    }
}

/// Whether an inbound frame is for this member: anonymous senders and
/// foreign destinations are dropped.
pub fn addressed_to(frame: &Frame, id: MemberId) -> bool {
    frame.src != 0 && frame.dst == id
}

/// The reply a member owes for an accepted inbound frame, if any:
/// requests get the conventional mti + 10 answer, replies are final.
pub fn auto_reply(frame: &Frame) -> Option<Frame> {
    if frame.is_reply() {
        None
    } else {
        Some(frame.reply_to())
    }
}
