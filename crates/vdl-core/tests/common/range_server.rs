//! Minimal HTTP/1.1 server that supports HEAD and Range GET for integration tests.
//!
//! Serves a single static body, one request per connection. Failure modes are
//! set through `RangeServerOptions`; every request is counted.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct RangeServerOptions {
    /// GET requests whose range starts at this offset get this status.
    pub fail_range_start: Option<(u64, u16)>,
    /// The first N GET requests (server-wide) get 429 Too Many Requests.
    pub throttle_first: usize,
    /// GET ignores Range and always returns 200 with the full body.
    pub ignore_ranges: bool,
    /// Send response bodies in writes of this many bytes with this pause
    /// between them (a slow but steady link).
    pub trickle: Option<(usize, Duration)>,
}

pub struct RangeServer {
    pub url: String,
    requests: Arc<AtomicUsize>,
    gets: Arc<AtomicUsize>,
}

impl RangeServer {
    /// Requests received so far (HEAD and GET).
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// GET requests received so far.
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body`. The server runs
/// until the process exits.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let requests = Arc::new(AtomicUsize::new(0));
    let gets = Arc::new(AtomicUsize::new(0));
    {
        let requests = Arc::clone(&requests);
        let gets = Arc::clone(&gets);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let body = Arc::clone(&body);
                let requests = Arc::clone(&requests);
                let gets = Arc::clone(&gets);
                thread::spawn(move || handle(stream, &body, opts, &requests, &gets));
            }
        });
    }
    RangeServer {
        url: format!("http://127.0.0.1:{}/media/lecture.mp4", port),
        requests,
        gets,
    }
}

fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8(buf).ok()
}

fn respond(stream: &mut TcpStream, status: &str, headers: &[String], body: &[u8]) {
    respond_paced(stream, status, headers, body, None);
}

fn respond_paced(
    stream: &mut TcpStream,
    status: &str,
    headers: &[String],
    body: &[u8],
    trickle: Option<(usize, Duration)>,
) {
    let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
    for h in headers {
        head.push_str(h);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    match trickle {
        Some((size, pause)) => {
            for piece in body.chunks(size.max(1)) {
                if stream.write_all(piece).and_then(|_| stream.flush()).is_err() {
                    return;
                }
                thread::sleep(pause);
            }
        }
        None => {
            let _ = stream.write_all(body);
        }
    }
}

fn handle(
    mut stream: TcpStream,
    body: &[u8],
    opts: RangeServerOptions,
    requests: &AtomicUsize,
    gets: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    requests.fetch_add(1, Ordering::SeqCst);
    let (method, range) = parse_request(&request);
    let total = body.len() as u64;

    if method.eq_ignore_ascii_case("HEAD") {
        // HEAD responses carry headers only
        let head = format!(
            "HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\n\r\n",
            total
        );
        let _ = stream.write_all(head.as_bytes());
        return;
    }
    if !method.eq_ignore_ascii_case("GET") {
        respond(&mut stream, "405 Method Not Allowed", &["Content-Length: 0".into()], b"");
        return;
    }

    let seen = gets.fetch_add(1, Ordering::SeqCst);
    if seen < opts.throttle_first {
        let page = b"slow down";
        respond(
            &mut stream,
            "429 Too Many Requests",
            &[format!("Content-Length: {}", page.len())],
            page,
        );
        return;
    }
    if let (Some((fail_start, code)), Some((start, _))) = (opts.fail_range_start, range) {
        if start == fail_start {
            let page = b"upstream unavailable";
            respond(
                &mut stream,
                &format!("{} Failure", code),
                &[format!("Content-Length: {}", page.len())],
                page,
            );
            return;
        }
    }

    match range {
        Some((start, end_incl)) if !opts.ignore_ranges => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl || start >= total {
                respond(
                    &mut stream,
                    "416 Range Not Satisfiable",
                    &[format!("Content-Range: bytes */{}", total), "Content-Length: 0".into()],
                    b"",
                );
                return;
            }
            let slice = &body[start as usize..=end_incl as usize];
            respond_paced(
                &mut stream,
                "206 Partial Content",
                &[
                    format!("Content-Length: {}", slice.len()),
                    format!("Content-Range: bytes {}-{}/{}", start, end_incl, total),
                    "Accept-Ranges: bytes".into(),
                ],
                slice,
                opts.trickle,
            );
        }
        _ => respond_paced(
            &mut stream,
            "200 OK",
            &[format!("Content-Length: {}", total)],
            body,
            opts.trickle,
        ),
    }
}

/// Returns (method, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut lines = request.lines();
    let method = lines
        .next()
        .and_then(|l| l.split_whitespace().next())
        .unwrap_or("");
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("range") {
            continue;
        }
        let Some(bounds) = value.trim().strip_prefix("bytes=") else {
            continue;
        };
        if let Some((a, b)) = bounds.split_once('-') {
            let start = a.trim().parse::<u64>().unwrap_or(0);
            let end = b.trim().parse::<u64>().unwrap_or(u64::MAX);
            range = Some((start, end));
        }
    }
    (method, range)
}
