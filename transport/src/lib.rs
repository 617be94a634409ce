//! Socket-like transport library exposing the same API over plain TCP and a
//! homegrown Reliable-UDP ("RUDP") protocol: connect, accept, send one
//! application packet, receive one application packet, disconnect.

pub mod counters;
pub mod error;
pub mod logger;
pub mod peerbook;
mod sendq;
pub mod socket;
pub mod wire;

pub use error::{Result, TransportError};
pub use socket::{accept, connect, disconnect, recv_pkt, send_pkt, Handle, Protocol};

/// The reference source uses 63 when no system `IPPROTO_RUDP` constant is
/// defined. Kept for callers that want to mirror the C-ABI protocol selector
/// convention from spec.md §6 instead of matching on [`Protocol`] directly.
pub const IPPROTO_RUDP: i32 = 63;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    /// Several tests drive the process-wide send queue, sequence counters,
    /// and socket registry. Serialize them so one test's retransmitter
    /// activity can't be mistaken for another's.
    pub static SERIAL: Mutex<()> = Mutex::new(());
}
