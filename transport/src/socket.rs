//! Socket-like API: `connect`, `accept`, `send_pkt`, `recv_pkt`,
//! `disconnect`. Dispatches on a protocol selector; TCP delegates straight
//! to the host networking stack, RUDP drives the handshake and stop-and-wait
//! protocol on top of `std::net::UdpSocket`.
//!
//! Grounded in `examples/original_source/src/sans_socket.c` (`sans_connect`,
//! `sans_accept`) and `sans_transport.c` (`sans_send_pkt`, `sans_recv_pkt`).

use crate::error::{Result, TransportError};
use crate::logger;
use crate::peerbook::PEER_BOOK;
use crate::sendq;
use crate::wire::{self, Packet, ACK, SYN, SYN_ACK};
use socket2::{Domain, Socket, Type};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Opaque integer identifying one socket. Created by `connect`/`accept`,
/// released exclusively by `disconnect`.
pub type Handle = i32;

/// TCP backlog used by `accept`.
const TCP_BACKLOG: i32 = 16;
/// Receive timeout used during the RUDP handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(20);
/// How many handshake round trips `connect` tries per candidate address
/// before moving on. Not specified by spec.md (which only says the
/// handshake loops "until progress"); bounding it is what lets `connect`
/// honor its own documented failure mode ("no candidate completes
/// handshake") instead of hanging forever on an unreachable peer. See
/// DESIGN.md.
const MAX_HANDSHAKE_ATTEMPTS: u32 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    /// The reference uses 63 when no system `IPPROTO_RUDP` constant is
    /// defined; kept here purely as documentation since this API takes the
    /// enum directly rather than a raw protocol number.
    Rudp,
}

enum Endpoint {
    Tcp(TcpStream),
    Rudp(Arc<UdpSocket>),
}

struct Registry {
    entries: Mutex<HashMap<Handle, Endpoint>>,
}

impl Registry {
    const fn new() -> Self {
        Registry {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn insert(&self, handle: Handle, endpoint: Endpoint) {
        self.entries.lock().unwrap().insert(handle, endpoint);
    }

    fn remove(&self, handle: Handle) -> Option<Endpoint> {
        self.entries.lock().unwrap().remove(&handle)
    }

    fn with<T>(&self, handle: Handle, f: impl FnOnce(&Endpoint) -> Result<T>) -> Result<T> {
        let entries = self.entries.lock().unwrap();
        let endpoint = entries.get(&handle).ok_or(TransportError::UnknownHandle)?;
        f(endpoint)
    }
}

static REGISTRY: Registry = Registry::new();
static NEXT_HANDLE: AtomicI32 = AtomicI32::new(0);

/// One datagram buffered between handshake completion and the first
/// `recv_pkt` call, per spec.md §4.4.3's rationale: the server's loose
/// "any datagram completes the handshake" rule may in fact be the first
/// DATA packet, which must still be delivered.
static PENDING_FIRST_DATAGRAM: Mutex<Option<(Handle, Vec<u8>)>> = Mutex::new(None);

fn next_handle() -> Handle {
    NEXT_HANDLE.fetch_add(1, Ordering::SeqCst)
}

fn validate_port(port: i32) -> Result<u16> {
    if !(1..=65535).contains(&port) {
        return Err(TransportError::InvalidArgument(format!(
            "port {port} outside 1-65535"
        )));
    }
    Ok(port as u16)
}

fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    if host.is_empty() {
        return Err(TransportError::InvalidArgument("host is empty".into()));
    }
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| TransportError::NameResolution(e.to_string()))?
        .collect();
    if addrs.is_empty() {
        return Err(TransportError::NameResolution(format!(
            "no addresses for {host}:{port}"
        )));
    }
    Ok(addrs)
}

/// Resolves `host:port` into one or more candidates and connects.
pub fn connect(host: &str, port: i32, protocol: Protocol) -> Result<Handle> {
    let port = validate_port(port)?;
    let candidates = resolve(host, port)?;

    match protocol {
        Protocol::Tcp => {
            for addr in &candidates {
                if let Ok(stream) = TcpStream::connect(addr) {
                    let handle = next_handle();
                    REGISTRY.insert(handle, Endpoint::Tcp(stream));
                    return Ok(handle);
                }
            }
            Err(TransportError::NameResolution(
                "no candidate accepted a TCP connection".into(),
            ))
        }
        Protocol::Rudp => {
            for addr in &candidates {
                let Ok(udp) = UdpSocket::bind("0.0.0.0:0") else {
                    continue;
                };
                if udp.set_read_timeout(Some(HANDSHAKE_TIMEOUT)).is_err() {
                    continue;
                }
                match handshake_client(&udp, *addr) {
                    Ok(()) => {
                        if udp.connect(addr).is_err() {
                            continue;
                        }
                        let handle = next_handle();
                        PEER_BOOK.save_peer(handle, *addr)?;
                        REGISTRY.insert(handle, Endpoint::Rudp(Arc::new(udp)));
                        sendq::ensure_worker_started();
                        return Ok(handle);
                    }
                    Err(_) => continue,
                }
            }
            Err(TransportError::HandshakeFailed(
                "no candidate completed the RUDP handshake".into(),
            ))
        }
    }
}

/// Resolves a passive bind address and accepts exactly one client.
pub fn accept(iface: &str, port: i32, protocol: Protocol) -> Result<Handle> {
    let port = validate_port(port)?;
    let bind_addr = if iface.is_empty() {
        SocketAddr::from(([0, 0, 0, 0], port))
    } else {
        resolve(iface, port)?[0]
    };

    match protocol {
        Protocol::Tcp => {
            let socket = Socket::new(
                Domain::for_address(bind_addr),
                Type::STREAM,
                Some(socket2::Protocol::TCP),
            )
            .map_err(TransportError::SocketSetup)?;
            socket
                .set_reuse_address(true)
                .map_err(TransportError::SocketSetup)?;
            socket
                .bind(&bind_addr.into())
                .map_err(TransportError::SocketSetup)?;
            socket
                .listen(TCP_BACKLOG)
                .map_err(TransportError::SocketSetup)?;
            let listener: TcpListener = socket.into();

            let (stream, _) = listener.accept().map_err(TransportError::SocketSetup)?;
            let handle = next_handle();
            REGISTRY.insert(handle, Endpoint::Tcp(stream));
            Ok(handle)
        }
        Protocol::Rudp => {
            let socket = Socket::new(
                Domain::for_address(bind_addr),
                Type::DGRAM,
                Some(socket2::Protocol::UDP),
            )
            .map_err(TransportError::SocketSetup)?;
            socket
                .set_reuse_address(true)
                .map_err(TransportError::SocketSetup)?;
            socket
                .bind(&bind_addr.into())
                .map_err(TransportError::SocketSetup)?;
            let udp: UdpSocket = socket.into();
            udp.set_read_timeout(Some(HANDSHAKE_TIMEOUT))
                .map_err(TransportError::SocketSetup)?;

            let (peer, leftover) = handshake_server(&udp)?;
            udp.connect(peer).map_err(TransportError::SocketSetup)?;

            let handle = next_handle();
            PEER_BOOK.save_peer(handle, peer)?;
            if let Some(bytes) = leftover {
                *PENDING_FIRST_DATAGRAM.lock().unwrap() = Some((handle, bytes));
            }
            REGISTRY.insert(handle, Endpoint::Rudp(Arc::new(udp)));
            sendq::ensure_worker_started();
            Ok(handle)
        }
    }
}

/// Client side of the three-way handshake: SYN / (wait for) SYN-ACK / ACK.
fn handshake_client(udp: &UdpSocket, target: SocketAddr) -> Result<()> {
    let syn = Packet::handshake(SYN).encode();
    let mut buf = [0u8; wire::MAX_DATAGRAM];

    for _ in 0..MAX_HANDSHAKE_ATTEMPTS {
        udp.send_to(&syn, target).map_err(TransportError::SocketSetup)?;

        match udp.recv_from(&mut buf) {
            Ok((n, from)) => {
                if let Some(pkt) = Packet::decode(&buf[..n]) {
                    if pkt.header.has(SYN) && pkt.header.has(ACK) {
                        let ack = Packet::handshake(ACK).encode();
                        let _ = udp.send_to(&ack, from);
                        return Ok(());
                    }
                }
                // Non-SYN-ACK datagram: ignore and retry.
            }
            Err(_) => {
                // Timed out or malformed: retry per spec.md §4.4.3.
            }
        }
    }
    Err(TransportError::HandshakeFailed(
        "handshake did not complete within the retry budget".into(),
    ))
}

/// Server side of the three-way handshake. Returns the peer address and,
/// if the datagram that completed the handshake parsed as DATA rather than
/// a bare ACK, its raw bytes so the caller can buffer it for the first
/// `recv_pkt`.
fn handshake_server(udp: &UdpSocket) -> Result<(SocketAddr, Option<Vec<u8>>)> {
    let mut buf = [0u8; wire::MAX_DATAGRAM];

    let from = loop {
        match udp.recv_from(&mut buf) {
            Ok((n, from)) => {
                if let Some(pkt) = Packet::decode(&buf[..n]) {
                    if pkt.header.has(SYN) {
                        break from;
                    }
                }
                // Not a SYN: discard and keep listening.
            }
            Err(_) => {
                // Timed out: resend nothing yet, just keep listening.
            }
        }
    };

    let synack = Packet::handshake(SYN_ACK).encode();
    loop {
        udp.send_to(&synack, from).map_err(TransportError::SocketSetup)?;

        match udp.recv_from(&mut buf) {
            Ok((n, _src)) => {
                // Any datagram completes the handshake. If it parses as a
                // DATA packet (not a bare final ACK), hand it back so it
                // isn't lost.
                let leftover = Packet::decode(&buf[..n])
                    .filter(|pkt| pkt.header.kind == wire::DATA)
                    .map(|_| buf[..n].to_vec());
                return Ok((from, leftover));
            }
            Err(_) => continue,
        }
    }
}

/// Looks up the peer for `handle` and enqueues a DATA packet. Returns `len`
/// once queued; transmission and acknowledgement are asynchronous.
pub fn send_pkt(handle: Handle, buf: &[u8]) -> Result<usize> {
    REGISTRY.with(handle, |endpoint| match endpoint {
        Endpoint::Tcp(stream) => {
            (&*stream).write_all(buf)?;
            Ok(buf.len())
        }
        Endpoint::Rudp(socket) => {
            PEER_BOOK.get_peer(handle)?;
            sendq::enqueue_packet(handle, socket.clone(), buf.to_vec());
            Ok(buf.len())
        }
    })
}

/// Blocks on the underlying socket and returns one delivered application
/// payload, truncated to `max_len`. An empty result means orderly close.
pub fn recv_pkt(handle: Handle, max_len: usize) -> Result<Vec<u8>> {
    REGISTRY.with(handle, |endpoint| match endpoint {
        Endpoint::Tcp(stream) => {
            let mut buf = vec![0u8; max_len];
            let n = (&*stream).read(&mut buf)?;
            buf.truncate(n);
            Ok(buf)
        }
        Endpoint::Rudp(socket) => recv_pkt_rudp(handle, socket, max_len),
    })
}

fn recv_pkt_rudp(handle: Handle, socket: &UdpSocket, max_len: usize) -> Result<Vec<u8>> {
    if let Some(bytes) = take_pending_first_datagram(handle) {
        if let Some(delivered) = process_datagram(socket, &bytes, max_len)? {
            return Ok(delivered);
        }
        // The buffered datagram turned out to be stale/out-of-order; fall
        // through to the normal receive loop.
    }

    let mut buf = [0u8; wire::MAX_DATAGRAM];
    loop {
        let (n, src) = socket.recv_from(&mut buf)?;
        if n == 0 {
            return Err(TransportError::Receive(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "zero-length datagram",
            )));
        }
        if let Some(delivered) = process_datagram_from(socket, &buf[..n], src, max_len)? {
            return Ok(delivered);
        }
        // Duplicate or out-of-order: re-acknowledged inside
        // process_datagram_from, keep looping.
    }
}

fn take_pending_first_datagram(handle: Handle) -> Option<Vec<u8>> {
    let mut pending = PENDING_FIRST_DATAGRAM.lock().unwrap();
    match pending.take() {
        Some((h, bytes)) if h == handle => Some(bytes),
        other => {
            *pending = other;
            None
        }
    }
}

fn process_datagram(socket: &UdpSocket, raw: &[u8], max_len: usize) -> Result<Option<Vec<u8>>> {
    // The socket is connected to its peer by the time a first datagram can
    // be buffered (both `connect` and `accept` call `UdpSocket::connect`
    // right after the handshake), so its peer address is always known here.
    let peer = socket.peer_addr().map_err(TransportError::Receive)?;
    process_datagram_from(socket, raw, peer, max_len)
}

/// Implements spec.md §4.4.5 steps 2-3: validate sequence, ACK, deliver.
fn process_datagram_from(
    socket: &UdpSocket,
    raw: &[u8],
    src: SocketAddr,
    max_len: usize,
) -> Result<Option<Vec<u8>>> {
    let Some(pkt) = Packet::decode(raw) else {
        return Ok(None);
    };

    let expected = crate::counters::recv_seq();
    if pkt.header.seqnum != expected {
        let ack = Packet::ack(expected - 1);
        let _ = socket.send_to(&ack.encode(), src);
        return Ok(None);
    }

    let mut payload = pkt.payload;
    payload.truncate(max_len);

    let ack = Packet::ack(expected);
    let _ = socket.send_to(&ack.encode(), src);
    crate::counters::RECV_SEQ.fetch_add(1, Ordering::SeqCst);

    Ok(Some(payload))
}

/// Releases the underlying socket. The peer address-book entry is
/// intentionally left in place, per spec.md §4.4.6.
pub fn disconnect(handle: Handle) -> Result<()> {
    match REGISTRY.remove(handle) {
        Some(Endpoint::Tcp(stream)) => {
            let _ = stream.shutdown(Shutdown::Both);
            Ok(())
        }
        Some(Endpoint::Rudp(_socket)) => Ok(()),
        None => {
            logger::log_warning("disconnect called on an unknown handle");
            Err(TransportError::UnknownHandle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SERIAL;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::net::Ipv4Addr;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    #[test]
    fn rejects_out_of_range_ports() {
        assert!(matches!(
            connect("127.0.0.1", 0, Protocol::Tcp),
            Err(TransportError::InvalidArgument(_))
        ));
        assert!(matches!(
            connect("127.0.0.1", 65536, Protocol::Tcp),
            Err(TransportError::InvalidArgument(_))
        ));
        assert!(matches!(
            accept("", 0, Protocol::Tcp),
            Err(TransportError::InvalidArgument(_))
        ));
    }

    #[test]
    fn send_pkt_without_peer_fails_without_enqueueing() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let handle = next_handle();
        REGISTRY.insert(handle, Endpoint::Rudp(Arc::new(socket)));
        assert!(matches!(
            send_pkt(handle, b"hi"),
            Err(TransportError::NoPeer)
        ));
    }

    #[test]
    fn tcp_connect_accept_round_trip() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let server = thread::spawn(move || {
            let handle = accept("127.0.0.1", port as i32, Protocol::Tcp).unwrap();
            let data = recv_pkt(handle, 64).unwrap();
            assert_eq!(&data, b"ping");
            send_pkt(handle, b"pong").unwrap();
            disconnect(handle).unwrap();
        });

        // Give the server a moment to bind before the client connects.
        thread::sleep(Duration::from_millis(50));

        let handle = connect("127.0.0.1", port as i32, Protocol::Tcp).unwrap();
        send_pkt(handle, b"ping").unwrap();
        let reply = recv_pkt(handle, 64).unwrap();
        assert_eq!(&reply, b"pong");
        disconnect(handle).unwrap();

        server.join().unwrap();
    }

    /// spec.md §8 boundary behavior: `recv_pkt` with `max_len = 0` must not
    /// consume an application byte on the TCP path either.
    #[test]
    fn recv_pkt_tcp_max_len_zero_does_not_consume_data() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();

        let writer = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"hello").unwrap();
        });

        let (stream, _) = listener.accept().unwrap();
        writer.join().unwrap();

        let handle = next_handle();
        REGISTRY.insert(handle, Endpoint::Tcp(stream));

        let empty = recv_pkt(handle, 0).unwrap();
        assert!(empty.is_empty());

        let rest = recv_pkt(handle, 64).unwrap();
        assert_eq!(&rest, b"hello");
    }

    #[test]
    fn recv_pkt_max_len_zero_still_advances_recv_seq() {
        let _guard = SERIAL.lock().unwrap();

        let server_udp = UdpSocket::bind("127.0.0.1:0").unwrap();
        let server_addr = server_udp.local_addr().unwrap();
        let client_udp = UdpSocket::bind("127.0.0.1:0").unwrap();
        client_udp.connect(server_addr).unwrap();
        server_udp.connect(client_udp.local_addr().unwrap()).unwrap();

        let expected = crate::counters::recv_seq();
        let pkt = Packet::data(expected, b"ignored".to_vec());
        client_udp.send(&pkt.encode()).unwrap();

        server_udp
            .set_read_timeout(Some(Duration::from_secs(1)))
            .unwrap();
        let handle = next_handle();
        let delivered = recv_pkt_rudp(handle, &server_udp, 0).unwrap();
        assert!(delivered.is_empty());
        assert_eq!(crate::counters::recv_seq(), expected + 1);
    }

    fn rudp_pair() -> (UdpSocket, UdpSocket) {
        let server_udp = UdpSocket::bind("127.0.0.1:0").unwrap();
        let client_udp = UdpSocket::bind("127.0.0.1:0").unwrap();
        server_udp.connect(client_udp.local_addr().unwrap()).unwrap();
        client_udp.connect(server_udp.local_addr().unwrap()).unwrap();
        server_udp
            .set_read_timeout(Some(Duration::from_secs(1)))
            .unwrap();
        client_udp
            .set_read_timeout(Some(Duration::from_secs(1)))
            .unwrap();
        (server_udp, client_udp)
    }

    /// spec.md §8 end-to-end scenario 4: a duplicate DATA (the sender's
    /// previous ACK was lost) is re-acknowledged but delivered only once.
    #[test]
    fn duplicate_inbound_data_acks_without_redelivering() {
        let _guard = SERIAL.lock().unwrap();

        let (server_udp, client_udp) = rudp_pair();
        let expected = crate::counters::recv_seq();

        let dup = Packet::data(expected - 1, b"dup".to_vec());
        client_udp.send(&dup.encode()).unwrap();
        let ok = Packet::data(expected, b"ok".to_vec());
        client_udp.send(&ok.encode()).unwrap();

        let handle = next_handle();
        let delivered = recv_pkt_rudp(handle, &server_udp, 64).unwrap();
        assert_eq!(delivered, b"ok");
        assert_eq!(crate::counters::recv_seq(), expected + 1);

        let mut buf = [0u8; wire::MAX_DATAGRAM];
        let n1 = client_udp.recv(&mut buf).unwrap();
        let first_ack = Packet::decode(&buf[..n1]).unwrap();
        assert_eq!(first_ack.header.kind, wire::ACK);
        assert_eq!(first_ack.header.seqnum, expected - 1);

        let n2 = client_udp.recv(&mut buf).unwrap();
        let second_ack = Packet::decode(&buf[..n2]).unwrap();
        assert_eq!(second_ack.header.seqnum, expected);
    }

    /// spec.md §8 end-to-end scenario 5: an out-of-order DATA arrives
    /// before the in-order one; the caller's `recv_pkt` still returns the
    /// in-order payload, and each arrival gets its own ACK.
    #[test]
    fn out_of_order_inbound_data_delivers_in_sequence_payload() {
        let _guard = SERIAL.lock().unwrap();

        let (server_udp, client_udp) = rudp_pair();
        let expected = crate::counters::recv_seq();

        let future = Packet::data(expected + 1, b"future".to_vec());
        client_udp.send(&future.encode()).unwrap();
        let now = Packet::data(expected, b"now".to_vec());
        client_udp.send(&now.encode()).unwrap();

        let handle = next_handle();
        let delivered = recv_pkt_rudp(handle, &server_udp, 64).unwrap();
        assert_eq!(delivered, b"now");
        assert_eq!(crate::counters::recv_seq(), expected + 1);

        let mut buf = [0u8; wire::MAX_DATAGRAM];
        let n1 = client_udp.recv(&mut buf).unwrap();
        let first_ack = Packet::decode(&buf[..n1]).unwrap();
        assert_eq!(first_ack.header.seqnum, expected - 1);

        let n2 = client_udp.recv(&mut buf).unwrap();
        let second_ack = Packet::decode(&buf[..n2]).unwrap();
        assert_eq!(second_ack.header.seqnum, expected);
    }

    /// spec.md §8 end-to-end scenario 6: drives `connect`/`accept` through
    /// a lossy relay (20% drop on every datagram, seeded for a
    /// reproducible run) and confirms the three-way handshake still
    /// converges on both sides within the retry budget. This is also the
    /// only test that exercises `connect`/`accept` for `Protocol::Rudp`
    /// end to end rather than through internal helpers.
    #[test]
    fn rudp_handshake_converges_under_simulated_loss() {
        let _guard = SERIAL.lock().unwrap();

        let probe = UdpSocket::bind("127.0.0.1:0").unwrap();
        let server_port = probe.local_addr().unwrap().port();
        drop(probe);

        let relay_client_socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let relay_port = relay_client_socket.local_addr().unwrap().port();
        let relay_server_socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        relay_client_socket
            .set_read_timeout(Some(Duration::from_millis(5)))
            .unwrap();
        relay_server_socket
            .set_read_timeout(Some(Duration::from_millis(5)))
            .unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let relay_stop = stop.clone();
        let server_addr = SocketAddr::from(([127, 0, 0, 1], server_port));

        let relay = thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(42);
            let mut client_addr: Option<SocketAddr> = None;
            let mut buf = [0u8; wire::MAX_DATAGRAM];
            while !relay_stop.load(Ordering::SeqCst) {
                if let Ok((n, from)) = relay_client_socket.recv_from(&mut buf) {
                    client_addr = Some(from);
                    if !rng.gen_bool(0.2) {
                        let _ = relay_server_socket.send_to(&buf[..n], server_addr);
                    }
                }
                if let Ok((n, _)) = relay_server_socket.recv_from(&mut buf) {
                    if let Some(addr) = client_addr {
                        if !rng.gen_bool(0.2) {
                            let _ = relay_client_socket.send_to(&buf[..n], addr);
                        }
                    }
                }
            }
        });

        let accept_handle =
            thread::spawn(move || accept("127.0.0.1", server_port as i32, Protocol::Rudp));
        thread::sleep(Duration::from_millis(20));

        let client_handle = connect("127.0.0.1", relay_port as i32, Protocol::Rudp)
            .expect("client handshake should converge despite 20% datagram loss");

        // The client's final handshake ACK may itself be dropped; sending
        // application data gives the server's "any datagram completes the
        // handshake" rule (spec.md §4.4.3) something to retry against.
        send_pkt(client_handle, b"probe").unwrap();

        let server_handle = accept_handle
            .join()
            .unwrap()
            .expect("server handshake should converge despite 20% datagram loss");

        let delivered = recv_pkt(server_handle, 64).unwrap();
        assert_eq!(delivered, b"probe");

        // Let the probe's ACK make it back through the relay and the send
        // queue drain before tearing down.
        thread::sleep(Duration::from_millis(300));

        stop.store(true, Ordering::SeqCst);
        relay.join().unwrap();

        assert!(PEER_BOOK.get_peer(client_handle).is_ok());
        assert!(PEER_BOOK.get_peer(server_handle).is_ok());

        disconnect(client_handle).unwrap();
        disconnect(server_handle).unwrap();
    }
}
