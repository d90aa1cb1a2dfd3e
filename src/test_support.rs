//! Minimal HTTP responders for tests
//!
//! A responder answers every request with a fixed status and body, after an
//! optional delay. Pointed at as a proxy it answers for any target URL,
//! since an HTTP proxy receives plain absolute-form requests.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Canned response served by [`spawn_responder`]
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub delay: Duration,
    /// Advertised `Content-Length` when it should differ from the body
    pub content_length: Option<usize>,
}

impl MockResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
            content_length: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            delay: Duration::ZERO,
            content_length: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Advertise `len` bytes but send only the body, then hang up
    pub fn with_content_length(mut self, len: usize) -> Self {
        self.content_length = Some(len);
        self
    }
}

/// Serve `response` to every connection until the test runtime stops
pub async fn spawn_responder(response: MockResponse) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let response = response.clone();
            tokio::spawn(async move {
                serve(stream, response).await;
            });
        }
    });

    addr
}

/// Accept connections and never answer them
pub async fn spawn_black_hole() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    addr
}

async fn serve(mut stream: TcpStream, response: MockResponse) {
    let mut buf = vec![0u8; 8192];
    let mut read = 0;
    loop {
        match stream.read(&mut buf[read..]).await {
            Ok(0) | Err(_) => return,
            Ok(n) => read += n,
        }
        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") || read == buf.len() {
            break;
        }
    }

    tokio::time::sleep(response.delay).await;

    let head = format!(
        "HTTP/1.1 {} Mock\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        response.status,
        response.content_length.unwrap_or(response.body.len())
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(&response.body).await;
    let _ = stream.shutdown().await;
}
