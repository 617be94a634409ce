//! RUDP datagram layout and type flags.
//!
//! Every datagram begins with a one-byte type field (a bitmask, flags may be
//! OR'd together) followed by a four-byte sequence number, then an optional
//! payload. The reference C implementation transmits `seqnum` in host byte
//! order; this port picks little-endian explicitly (see DESIGN.md) so the
//! wire format is portable across architectures.

/// Plain data carrying an application payload.
pub const DATA: u8 = 0;
/// Handshake: connection request.
pub const SYN: u8 = 1;
/// Acknowledgement of a DATA or SYN packet.
pub const ACK: u8 = 2;
/// Connection teardown (unused by the current handshake/data path, reserved
/// for the disconnect extension described in spec.md's Non-goals).
pub const FIN: u8 = 4;
/// Convenience combination used by the server's handshake reply.
pub const SYN_ACK: u8 = SYN | ACK;

/// `type` (1 byte) + `seqnum` (4 bytes).
pub const HEADER_LEN: usize = 5;
/// Datagrams larger than this MUST NOT be produced by the transport.
pub const MAX_DATAGRAM: usize = 1024;
/// Largest application payload a single RUDP packet can carry.
pub const MAX_PAYLOAD: usize = MAX_DATAGRAM - HEADER_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: u8,
    pub seqnum: i32,
}

impl Header {
    pub fn new(kind: u8, seqnum: i32) -> Self {
        Header { kind, seqnum }
    }

    pub fn has(&self, flag: u8) -> bool {
        self.kind & flag == flag
    }
}

#[derive(Debug, Clone)]
pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(kind: u8, seqnum: i32, payload: Vec<u8>) -> Self {
        Packet {
            header: Header::new(kind, seqnum),
            payload,
        }
    }

    pub fn handshake(kind: u8) -> Self {
        Packet::new(kind, 0, Vec::new())
    }

    pub fn ack(seqnum: i32) -> Self {
        Packet::new(ACK, seqnum, Vec::new())
    }

    pub fn data(seqnum: i32, payload: Vec<u8>) -> Self {
        Packet::new(DATA, seqnum, payload)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.push(self.header.kind);
        buf.extend_from_slice(&self.header.seqnum.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    pub fn decode(buf: &[u8]) -> Option<Packet> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        let kind = buf[0];
        let seqnum = i32::from_le_bytes(buf[1..5].try_into().ok()?);
        let payload = buf[HEADER_LEN..].to_vec();
        Some(Packet {
            header: Header::new(kind, seqnum),
            payload,
        })
    }
}
