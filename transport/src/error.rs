use std::fmt;
use std::io;

/// Error kinds surfaced by the transport, per the external error design:
/// every public operation collapses its `Result` to a negative return value
/// at the socket API boundary, but callers that want the structured reason
/// can call the `Result`-returning inner functions directly.
#[derive(Debug)]
pub enum TransportError {
    /// Null/empty host, port outside 1-65535, zero-length buffers.
    InvalidArgument(String),
    /// Name resolution returned no usable address for host/port.
    NameResolution(String),
    /// Underlying socket creation, bind, listen, or accept call failed.
    SocketSetup(io::Error),
    /// `send_pkt` invoked on a handle with no handshake record.
    NoPeer,
    /// The peer address book has no free slot for a new handle.
    AddressBookFull,
    /// Caller-supplied buffer was too small to hold the stored peer address.
    BufferTooSmall,
    /// Underlying datagram or stream read failed in a non-retriable way.
    Receive(io::Error),
    /// The handle does not refer to an open socket.
    UnknownHandle,
    /// No candidate address completed the RUDP three-way handshake.
    HandshakeFailed(String),
    /// A collaborator agent received a reply it did not expect (e.g. an
    /// SMTP command rejected with the wrong status code).
    UnexpectedReply(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            TransportError::NameResolution(msg) => write!(f, "name resolution failed: {msg}"),
            TransportError::SocketSetup(e) => write!(f, "socket setup failed: {e}"),
            TransportError::NoPeer => write!(f, "no peer recorded for handle"),
            TransportError::AddressBookFull => write!(f, "peer address book is full"),
            TransportError::BufferTooSmall => write!(f, "caller buffer too small for peer address"),
            TransportError::Receive(e) => write!(f, "receive failed: {e}"),
            TransportError::UnknownHandle => write!(f, "unknown socket handle"),
            TransportError::HandshakeFailed(msg) => write!(f, "RUDP handshake failed: {msg}"),
            TransportError::UnexpectedReply(msg) => write!(f, "unexpected reply: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::SocketSetup(e) | TransportError::Receive(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        TransportError::Receive(e)
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
