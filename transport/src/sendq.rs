//! Bounded send queue and the dedicated background retransmitter that drives
//! the stop-and-wait protocol, grounded in
//! `examples/original_source/src/sans_backend.c` (`enqueue_packet` /
//! `rudp_backend`).

use crate::counters::{self, SEND_SEQ};
use crate::logger;
use crate::socket::Handle;
use crate::wire::{self, Packet, ACK};
use std::collections::VecDeque;
use std::io;
use std::net::UdpSocket;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

/// Stop-and-wait: at most one unacknowledged packet in flight.
const WINDOW_SIZE: usize = 1;
const TRANSMIT_BACKOFF: Duration = Duration::from_millis(10);
const ACK_TIMEOUT: Duration = Duration::from_millis(100);
const IDLE_POLL: Duration = Duration::from_millis(1);

#[derive(Clone)]
struct Entry {
    #[allow(dead_code)]
    handle: Handle,
    socket: Arc<UdpSocket>,
    payload: Vec<u8>,
}

pub struct SendQueue {
    queue: Mutex<VecDeque<Entry>>,
    not_full: Condvar,
}

impl SendQueue {
    const fn new() -> Self {
        SendQueue {
            queue: Mutex::new(VecDeque::new()),
            not_full: Condvar::new(),
        }
    }

    /// Blocks the caller while the queue is full; on return the packet is
    /// queued and a copy of its bytes has been transferred to the worker.
    /// Does not transmit.
    fn enqueue(&self, entry: Entry) {
        let mut queue = self.queue.lock().unwrap();
        while queue.len() >= WINDOW_SIZE {
            queue = self.not_full.wait(queue).unwrap();
        }
        queue.push_back(entry);
    }

    fn peek_head(&self) -> Option<Entry> {
        self.queue.lock().unwrap().front().cloned()
    }

    fn remove_head(&self) {
        let mut queue = self.queue.lock().unwrap();
        queue.pop_front();
        drop(queue);
        self.not_full.notify_one();
    }
}

static QUEUE: SendQueue = SendQueue::new();
static WORKER_STARTED: OnceLock<()> = OnceLock::new();

/// Caller-facing contract: `enqueue_packet(handle, socket, buf)`. Returns
/// once the packet is queued; transmission and acknowledgement happen
/// asynchronously on the retransmitter thread.
pub fn enqueue_packet(handle: Handle, socket: Arc<UdpSocket>, payload: Vec<u8>) {
    ensure_worker_started();
    QUEUE.enqueue(Entry {
        handle,
        socket,
        payload,
    });
}

/// Starts the single long-lived retransmitter thread, once per process.
pub fn ensure_worker_started() {
    WORKER_STARTED.get_or_init(|| {
        thread::spawn(retransmitter_loop);
    });
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
    )
}

/// The dedicated background worker. See spec.md §4.3 for the numbered loop
/// this function implements verbatim.
fn retransmitter_loop() {
    let mut recv_buf = [0u8; wire::MAX_DATAGRAM];

    loop {
        let Some(entry) = QUEUE.peek_head() else {
            thread::sleep(IDLE_POLL);
            continue;
        };

        let seq = counters::send_seq();
        let packet = Packet::data(seq, entry.payload.clone());
        let bytes = packet.encode();

        if !transmit_with_backoff(&entry.socket, &bytes) {
            // Fatal (non-transient) send error: the socket was closed out
            // from under us by a `disconnect`. Abandon the head entry and
            // let the next iteration move on.
            logger::log_warning("send failed fatally, abandoning queued packet");
            QUEUE.remove_head();
            continue;
        }

        let _ = entry.socket.set_read_timeout(Some(ACK_TIMEOUT));
        match entry.socket.recv(&mut recv_buf) {
            Ok(n) => {
                if let Some(ack) = Packet::decode(&recv_buf[..n]) {
                    if ack.header.has(ACK) && ack.header.seqnum == seq {
                        SEND_SEQ.fetch_add(1, Ordering::SeqCst);
                        QUEUE.remove_head();
                    }
                    // Any other outcome: stale/duplicate ACK or non-ACK
                    // datagram. Leave send_seq and the queue untouched; the
                    // outer loop retransmits next iteration.
                }
            }
            Err(_) => {
                // Timeout or receive error: retransmit on the next pass.
            }
        }
    }
}

/// Retries the same datagram through transient send failures. Returns false
/// if the failure is not transient (the caller should abandon the entry).
fn transmit_with_backoff(socket: &UdpSocket, bytes: &[u8]) -> bool {
    loop {
        match socket.send(bytes) {
            Ok(_) => return true,
            Err(e) if is_transient(&e) => thread::sleep(TRANSMIT_BACKOFF),
            Err(_) => return false,
        }
    }
}
