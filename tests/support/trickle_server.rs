//! Minimal HTTP/1.1 file server that sends bodies in timed pieces.
//!
//! Wiremock delays a response as a whole; pausing in the middle of a body
//! needs bytes that keep arriving while the reader is stopped.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use super::range_responder::parse_range;

#[derive(Clone)]
struct Served {
    data: Arc<Vec<u8>>,
    piece: usize,
    gap: Duration,
    accept_ranges: bool,
    gets: Arc<AtomicUsize>,
}

/// A running server; stops when dropped.
pub struct TrickleServer {
    addr: SocketAddr,
    gets: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl TrickleServer {
    /// Serves `data` at every path, `piece` bytes every `gap`.
    ///
    /// Returns `None` when no localhost socket can be bound.
    pub async fn start(
        data: Vec<u8>,
        piece: usize,
        gap: Duration,
        accept_ranges: bool,
    ) -> Option<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await.ok()?;
        let addr = listener.local_addr().ok()?;
        let gets = Arc::new(AtomicUsize::new(0));
        let served = Served {
            data: Arc::new(data),
            piece: piece.max(1),
            gap,
            accept_ranges,
            gets: Arc::clone(&gets),
        };
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, served.clone()));
            }
        });
        Some(Self { addr, gets, task })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// GET requests received so far.
    pub fn get_requests(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl Drop for TrickleServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(mut stream: TcpStream, served: Served) {
    let mut pending: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let head_end = loop {
            if let Some(pos) = pending.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => pending.extend_from_slice(&buf[..n]),
            }
        };
        let head = String::from_utf8_lossy(&pending[..head_end]).into_owned();
        pending.drain(..head_end);

        if respond(&mut stream, &head, &served).await.is_err() {
            return;
        }
    }
}

async fn respond(stream: &mut TcpStream, head: &str, served: &Served) -> std::io::Result<()> {
    let method = head.split_whitespace().next().unwrap_or_default();
    let range = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("range"))
        .and_then(|(_, value)| parse_range(value));
    let total = served.data.len();
    let accept = if served.accept_ranges { "bytes" } else { "none" };

    if method == "HEAD" {
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {total}\r\nAccept-Ranges: {accept}\r\n\r\n"
        );
        return stream.write_all(head.as_bytes()).await;
    }
    served.gets.fetch_add(1, Ordering::SeqCst);

    let (status, start, end) = match range {
        Some((start, end)) if served.accept_ranges => {
            ("206 Partial Content", start, end.min(total - 1))
        }
        _ => ("200 OK", 0, total - 1),
    };
    let body = &served.data[start..=end];
    let mut head = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nAccept-Ranges: {accept}\r\n",
        body.len()
    );
    if status.starts_with("206") {
        head.push_str(&format!("Content-Range: bytes {start}-{end}/{total}\r\n"));
    }
    head.push_str("\r\n");
    stream.write_all(head.as_bytes()).await?;

    for piece in body.chunks(served.piece) {
        stream.write_all(piece).await?;
        stream.flush().await?;
        tokio::time::sleep(served.gap).await;
    }
    Ok(())
}
