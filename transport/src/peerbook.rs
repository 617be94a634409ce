//! Process-wide mapping from socket handle to last-known peer address,
//! populated during the RUDP handshake.
//!
//! The reference C implementation (`sans_transport.c::addrbook_set`) stores
//! opaque `sockaddr_storage` blobs and a caller-supplied length. Rust's
//! `std::net::SocketAddr` already is that fixed-size, address-family-agnostic
//! value, so this port stores it directly rather than reinventing a byte
//! blob + length pair; `get_peer`'s `buffer_too_small` outcome from spec.md
//! §4.2 has no counterpart here since there is no caller buffer to size
//! (documented in DESIGN.md).

use crate::error::{Result, TransportError};
use crate::socket::Handle;
use std::net::SocketAddr;
use std::sync::Mutex;

/// Fixed-size table capacity, matching the reference's `RUDP_ADDRBOOK_CAP`.
const CAPACITY: usize = 128;

struct Entry {
    handle: Handle,
    addr: SocketAddr,
}

pub struct PeerBook {
    entries: Mutex<Vec<Entry>>,
}

impl PeerBook {
    const fn new() -> Self {
        PeerBook {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Insert or update the entry for `handle`. Fails only when the table is
    /// full and no existing entry for `handle` already exists.
    pub fn save_peer(&self, handle: Handle, addr: SocketAddr) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.iter_mut().find(|e| e.handle == handle) {
            entry.addr = addr;
            return Ok(());
        }
        if entries.len() >= CAPACITY {
            return Err(TransportError::AddressBookFull);
        }
        entries.push(Entry { handle, addr });
        Ok(())
    }

    /// Retrieve the entry for `handle`.
    pub fn get_peer(&self, handle: Handle) -> Result<SocketAddr> {
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.addr)
            .ok_or(TransportError::NoPeer)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// The address book is shared process-wide; all access is serialized
/// through a single coarse-grained mutex, per spec.md §4.2 / §9.
pub static PEER_BOOK: PeerBook = PeerBook::new();
