//! Minimal SMTP submission agent: reads `<email>` and `<path>` from stdin,
//! submits the file at `path` as the body of a message to `email`, and
//! prints the server's final response.
//!
//! Grounded in `examples/original_source/src/smtp_agent.c`. This agent is
//! explicitly a thin collaborator (spec.md §1) — it speaks just enough of
//! the submission dialog (HELO/MAIL/RCPT/DATA/QUIT) to deliver one message.

use sans_transport::logger::{log_error, log_info, log_warning};
use sans_transport::{
    connect, disconnect, recv_pkt, send_pkt, Handle, Protocol, Result, TransportError,
};
use std::env;
use std::fs;
use std::io::{self, BufRead};

const RECV_CHUNK: usize = 256;
const SEND_CHUNK: usize = 1024;

fn send_line(handle: Handle, line: &str) -> Result<()> {
    let mut framed = String::with_capacity(line.len() + 2);
    framed.push_str(line);
    framed.push_str("\r\n");
    send_pkt(handle, framed.as_bytes())?;
    Ok(())
}

/// Reads one response chunk and returns it as a lossily-decoded string.
/// The reference agent does not reassemble multi-line responses; a single
/// `recv_pkt` call is treated as one reply.
fn recv_reply(handle: Handle) -> Result<String> {
    let chunk = recv_pkt(handle, RECV_CHUNK)?;
    Ok(String::from_utf8_lossy(&chunk).trim_end().to_string())
}

fn expect_code(reply: &str, expected: &str) -> bool {
    reply.starts_with(expected)
}

/// Fails the submission when `reply` doesn't carry `expected`'s status
/// code, closing the connection first so the process still exits non-zero
/// on a rejected dialogue step.
fn require_code(handle: Handle, step: &str, reply: &str, expected: &str) -> Result<()> {
    if expect_code(reply, expected) {
        return Ok(());
    }
    log_error(&format!("{step} rejected: {reply}"));
    let _ = disconnect(handle);
    Err(TransportError::UnexpectedReply(format!(
        "{step}: {reply}"
    )))
}

/// Dot-stuffs a message body: any line beginning with `.` gets an extra `.`
/// prepended, per RFC 5321 §4.5.2. Appends a trailing CRLF if the body does
/// not already end in one.
fn dot_stuff(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    for line in body.split_inclusive(|&b| b == b'\n') {
        if line.starts_with(b".") {
            out.push(b'.');
        }
        out.extend_from_slice(line);
    }
    if !out.ends_with(b"\r\n") {
        if out.ends_with(b"\n") {
            out.pop();
        }
        out.extend_from_slice(b"\r\n");
    }
    out
}

fn send_chunked(handle: Handle, bytes: &[u8]) -> Result<()> {
    for chunk in bytes.chunks(SEND_CHUNK) {
        send_pkt(handle, chunk)?;
    }
    Ok(())
}

fn submit(host: &str, port: u16, hostname: &str, email: &str, path: &str) -> Result<()> {
    let handle = connect(host, port as i32, Protocol::Tcp)?;

    let greeting = recv_reply(handle)?;
    require_code(handle, "greeting", &greeting, "220")?;

    send_line(handle, &format!("HELO {hostname}"))?;
    let reply = recv_reply(handle)?;
    require_code(handle, "HELO", &reply, "250")?;

    send_line(handle, &format!("MAIL FROM:<{email}>"))?;
    let reply = recv_reply(handle)?;
    require_code(handle, "MAIL FROM", &reply, "250")?;

    send_line(handle, &format!("RCPT TO:<{email}>"))?;
    let reply = recv_reply(handle)?;
    require_code(handle, "RCPT TO", &reply, "250")?;

    send_line(handle, "DATA")?;
    let reply = recv_reply(handle)?;
    require_code(handle, "DATA", &reply, "354")?;

    let body = fs::read(path).map_err(|_| {
        log_warning(&format!("could not read body file: {path}"));
        TransportError::InvalidArgument(path.to_string())
    })?;
    let stuffed = dot_stuff(&body);
    send_chunked(handle, &stuffed)?;
    send_line(handle, ".")?;

    let reply = recv_reply(handle)?;
    println!("{reply}");

    send_line(handle, "QUIT")?;
    let _ = recv_reply(handle)?;

    disconnect(handle)?;
    Ok(())
}

fn main() {
    let host = env::var("SANS_SMTP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("SANS_SMTP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(25);
    let hostname = env::var("SANS_SMTP_CLIENT_NAME").unwrap_or_else(|_| "localhost".to_string());

    let stdin = io::stdin();
    let mut lock = stdin.lock();
    let mut email = String::new();
    let mut path = String::new();
    if lock.read_line(&mut email).unwrap_or(0) == 0 || lock.read_line(&mut path).unwrap_or(0) == 0
    {
        log_error("expected an email address followed by a file path");
        std::process::exit(1);
    }
    let email = email.trim();
    let path = path.trim();

    log_info(&format!("submitting {path} to {email} via {host}:{port}"));

    if let Err(e) = submit(&host, port, &hostname, email, path) {
        log_error(&format!("submission failed: {e}"));
        std::process::exit(1);
    }
}
