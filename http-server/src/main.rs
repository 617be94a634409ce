//! Minimal HTTP/1.1 static file server: accepts one TCP client at a time,
//! serves a single GET request from a document root, and disconnects.
//!
//! Grounded in `examples/original_source/src/http_server.c`. This agent is
//! explicitly a thin collaborator (spec.md §1) — request parsing is limited
//! to the request line, and only `GET` is supported.

use sans_transport::logger::{log_error, log_info, log_success, log_warning};
use sans_transport::{accept, disconnect, recv_pkt, send_pkt, Handle, Protocol, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_REQUEST_SIZE: usize = 1024;
const SEND_CHUNK: usize = 1024;

struct Request {
    method: String,
    path: String,
}

fn parse_request_line(buf: &[u8]) -> Option<Request> {
    let text = std::str::from_utf8(buf).ok()?;
    let line = text.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    let _version = parts.next()?;
    if method.len() > 7 || path.len() > 511 {
        return None;
    }
    Some(Request {
        method: method.to_string(),
        path: path.to_string(),
    })
}

fn contains_dotdot(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}

/// Resolves a request path to a file under `root`, applying the same rules
/// as the reference server: `/` maps to `index.html`, a leading slash is
/// stripped, and any `..` path segment or an empty path is rejected.
fn resolve_path(root: &Path, requested: &str) -> Option<PathBuf> {
    let path = if requested == "/" {
        "index.html"
    } else {
        requested.strip_prefix('/').unwrap_or(requested)
    };
    if path.is_empty() || contains_dotdot(path) {
        return None;
    }
    Some(root.join(path))
}

fn content_type_for(_path: &Path) -> &'static str {
    "text/html; charset=utf-8"
}

fn send_not_found(handle: Handle) -> Result<()> {
    let body = b"<html><body><h1>404 Not Found</h1></body></html>";
    let response = format!(
        "HTTP/1.1 404 Not Found\r\n\
         Content-Length: {}\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Connection: close\r\n\
         \r\n",
        body.len()
    );
    send_pkt(handle, response.as_bytes())?;
    send_pkt(handle, body)?;
    Ok(())
}

fn send_file(handle: Handle, path: &Path, bytes: &[u8]) -> Result<()> {
    let headers = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Length: {}\r\n\
         Content-Type: {}\r\n\
         Connection: close\r\n\
         \r\n",
        bytes.len(),
        content_type_for(path)
    );
    send_pkt(handle, headers.as_bytes())?;
    for chunk in bytes.chunks(SEND_CHUNK) {
        send_pkt(handle, chunk)?;
    }
    Ok(())
}

fn serve_one(handle: Handle, root: &Path) -> Result<()> {
    let raw = recv_pkt(handle, MAX_REQUEST_SIZE)?;

    let request = match parse_request_line(&raw) {
        Some(r) if r.method == "GET" => r,
        Some(r) => {
            log_warning(&format!("unsupported method: {}", r.method));
            return send_not_found(handle);
        }
        None => {
            log_warning("malformed request line");
            return send_not_found(handle);
        }
    };

    let Some(resolved) = resolve_path(root, &request.path) else {
        log_warning(&format!("rejected path: {}", request.path));
        return send_not_found(handle);
    };

    match fs::read(&resolved) {
        Ok(bytes) => {
            log_success(&format!("200 {} ({} bytes)", request.path, bytes.len()));
            send_file(handle, &resolved, &bytes)
        }
        Err(_) => {
            log_warning(&format!("404 {}", request.path));
            send_not_found(handle)
        }
    }
}

fn main() {
    let iface = env::var("SANS_HTTP_IFACE").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: i32 = env::var("SANS_HTTP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let root = PathBuf::from(env::var("SANS_HTTP_ROOT").unwrap_or_else(|_| ".".to_string()));

    log_info(&format!("serving {} on {}:{}", root.display(), iface, port));

    loop {
        let handle = match accept(&iface, port, Protocol::Tcp) {
            Ok(h) => h,
            Err(e) => {
                log_error(&format!("accept failed: {e}"));
                continue;
            }
        };

        if let Err(e) = serve_one(handle, &root) {
            log_error(&format!("request failed: {e}"));
        }
        let _ = disconnect(handle);
    }
}
