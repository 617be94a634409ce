//! Minimal HTTP/1.1 client: reads one `<method> <path>` line from stdin,
//! issues a single request over `sans-transport`, and prints the response.
//!
//! Grounded in `examples/original_source/src/http_client.c`. This agent is
//! explicitly a thin collaborator (spec.md §1) — it does no form-level HTTP
//! parsing beyond locating the header/body boundary and an optional
//! `Content-Length`.

use sans_transport::logger::log_error;
use sans_transport::{connect, disconnect, recv_pkt, send_pkt, Protocol, Result as TransportResult};
use std::env;
use std::io::{self, BufRead, Write};

const MAX_BUFFER_SIZE: usize = 1024;

fn parse_request_line(line: &str) -> Option<(String, String)> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();
    Some((method, path))
}

fn build_request(method: &str, path: &str, host: &str, port: u16) -> String {
    let normalized_path = path.strip_prefix('/').unwrap_or(path);
    format!(
        "{method} /{normalized_path} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         User-Agent: sans/1.0\r\n\
         Cache-Control: no-cache\r\n\
         Connection: close\r\n\
         Accept: */*\r\n\
         \r\n"
    )
}

/// Case-insensitive search for a `Content-Length` header within the already
/// accumulated header block; returns the value if present.
fn find_content_length(headers: &str) -> Option<usize> {
    headers.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("Content-Length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn run(host: &str, port: u16, method: &str, path: &str) -> TransportResult<()> {
    let handle = connect(host, port as i32, Protocol::Tcp)?;

    let request = build_request(method, path, host, port);
    send_pkt(handle, request.as_bytes())?;

    let mut accumulated = String::new();
    let mut header_end: Option<usize> = None;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    loop {
        let chunk = recv_pkt(handle, MAX_BUFFER_SIZE)?;
        if chunk.is_empty() {
            break;
        }
        out.write_all(&chunk).ok();
        accumulated.push_str(&String::from_utf8_lossy(&chunk));
        if header_end.is_none() {
            if let Some(pos) = accumulated.find("\r\n\r\n") {
                header_end = Some(pos + 4);
                break;
            }
        }
    }

    if let Some(end) = header_end {
        let content_length = find_content_length(&accumulated[..end]);
        if let Some(len) = content_length {
            let already = accumulated.len().saturating_sub(end).min(len);
            let mut remaining = len - already;
            while remaining > 0 {
                let to_read = remaining.min(MAX_BUFFER_SIZE);
                let chunk = recv_pkt(handle, to_read)?;
                if chunk.is_empty() {
                    break;
                }
                out.write_all(&chunk).ok();
                remaining -= chunk.len();
            }
        } else {
            // No Content-Length: read until the server closes the connection.
            loop {
                let chunk = recv_pkt(handle, MAX_BUFFER_SIZE)?;
                if chunk.is_empty() {
                    break;
                }
                out.write_all(&chunk).ok();
            }
        }
    }

    disconnect(handle)?;
    Ok(())
}

fn main() {
    let host = env::var("SANS_HTTP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("SANS_HTTP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let stdin = io::stdin();
    let mut line = String::new();
    if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
        log_error("failed to read input");
        std::process::exit(1);
    }

    let Some((method, path)) = parse_request_line(line.trim_end()) else {
        log_error("expected a <method> <path> line");
        std::process::exit(1);
    };

    if let Err(e) = run(&host, port, &method, &path) {
        log_error(&format!("request failed: {e}"));
        std::process::exit(1);
    }
}
