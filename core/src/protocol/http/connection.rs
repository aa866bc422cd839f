/*
 * connection.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of SimpleGet, a minimal HTTP/HTTPS fetch library.
 *
 * SimpleGet is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * SimpleGet is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with SimpleGet.  If not, see <http://www.gnu.org/licenses/>.
 */

//! HTTP connection: one TCP or TLS stream, sends the request and accumulates the response.
//!
//! Receive runs in one of two modes. `UntilComplete` (plain HTTP) re-checks the buffer after
//! every read and stops as soon as a 200 response has its declared length, or a non-200 response
//! has its full header block. `UntilClose` (HTTPS) reads until the peer closes and only compares
//! lengths afterwards. Both wait for readiness instead of spinning, and both honour an optional
//! deadline.

use bytes::BytesMut;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tokio_rustls::client::TlsStream as TokioTlsStream;

use crate::error::FetchError;
use crate::protocol::http::h1;

const READ_CHUNK: usize = 8192;

/// Unified stream: plain TCP or TLS. Implements AsyncRead + AsyncWrite. Dropping it closes the socket.
pub enum HttpStream {
    Plain(TcpStream),
    Tls(Box<TokioTlsStream<TcpStream>>),
}

impl HttpStream {
    pub fn is_secure(&self) -> bool {
        matches!(self, HttpStream::Tls(_))
    }
}

impl AsyncRead for HttpStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for HttpStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_flush(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Point in time by which a whole fetch must finish, plus the budget it came from (for errors).
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, FetchError> {
        timeout_at(self.at, fut)
            .await
            .map_err(|_| FetchError::Timeout(self.budget))
    }
}

/// Run `fut`, bounded by the deadline when there is one.
pub async fn within<F: Future>(deadline: Option<Deadline>, fut: F) -> Result<F::Output, FetchError> {
    match deadline {
        Some(d) => d.run(fut).await,
        None => Ok(fut.await),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveMode {
    /// Stop on completeness, peer close, or a non-200 header block.
    UntilComplete,
    /// Stop only on end of stream (or any read error, which counts as end of stream).
    UntilClose,
}

/// Why the receive loop stopped.
#[derive(Debug)]
pub enum ReceiveEnd {
    /// 200 response with exactly the declared body length.
    Complete,
    /// Peer closed the connection.
    Closed,
    /// Non-200 status with a complete header block; the body was not read.
    ErrorStatus,
    Failed(FetchError),
}

/// Raw response bytes (header included) and the reason reading stopped.
#[derive(Debug)]
pub struct Received {
    pub data: BytesMut,
    pub end: ReceiveEnd,
}

/// HTTP connection: holds the stream and the response buffer. Consumed by `receive`, which
/// drops (closes) the stream before returning.
pub struct HttpConnection<S> {
    stream: S,
    read_buf: BytesMut,
    max_response_bytes: usize,
    deadline: Option<Deadline>,
}

impl<S> HttpConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, max_response_bytes: usize) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            max_response_bytes,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Deadline>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Write the whole request and flush.
    pub async fn send_request(&mut self, request: &[u8]) -> Result<(), FetchError> {
        let stream = &mut self.stream;
        within(self.deadline, async {
            stream.write_all(request).await?;
            stream.flush().await
        })
        .await?
        .map_err(FetchError::Send)?;
        log::debug!("sent {} request bytes", request.len());
        Ok(())
    }

    /// Read the response according to `mode`.
    pub async fn receive(mut self, mode: ReceiveMode) -> Received {
        let end = self.read_loop(mode).await;
        if mode == ReceiveMode::UntilClose {
            report_length_mismatch(&self.read_buf);
        }
        log::debug!("received {} bytes, end: {:?}", self.read_buf.len(), end);
        Received {
            data: self.read_buf,
            end,
        }
    }

    async fn read_loop(&mut self, mode: ReceiveMode) -> ReceiveEnd {
        let mut tmp = [0u8; READ_CHUNK];
        loop {
            let room = self.max_response_bytes.saturating_sub(self.read_buf.len());
            // at the ceiling, one more byte decides between end of stream and overflow
            let full = room == 0;
            let want = if full { 1 } else { room.min(READ_CHUNK) };
            let n = match within(self.deadline, self.stream.read(&mut tmp[..want])).await {
                Err(timeout) => return ReceiveEnd::Failed(timeout),
                Ok(Ok(n)) => n,
                Ok(Err(e)) => match mode {
                    ReceiveMode::UntilClose => {
                        log::debug!("read ended with error, treating as end of stream: {}", e);
                        return ReceiveEnd::Closed;
                    }
                    ReceiveMode::UntilComplete => match e.kind() {
                        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => continue,
                        io::ErrorKind::ConnectionReset => return ReceiveEnd::Closed,
                        _ => return ReceiveEnd::Failed(FetchError::Receive(e)),
                    },
                },
            };
            if n == 0 {
                return ReceiveEnd::Closed;
            }
            if full {
                return ReceiveEnd::Failed(FetchError::ResponseTooLarge {
                    limit: self.max_response_bytes,
                });
            }
            self.read_buf.extend_from_slice(&tmp[..n]);

            if mode == ReceiveMode::UntilComplete {
                let status = h1::status_code(&self.read_buf);
                if status == 200 && h1::is_complete(&self.read_buf) {
                    return ReceiveEnd::Complete;
                }
                if status != 0 && status != 200 && h1::header_boundary_length(&self.read_buf) > 0 {
                    return ReceiveEnd::ErrorStatus;
                }
            }
        }
    }
}

/// Close-delimited reads cannot tell truncation from success; say so when the lengths disagree.
fn report_length_mismatch(buf: &[u8]) {
    if !h1::is_ok(buf) {
        return;
    }
    if let h1::ContentLength::Declared(declared) = h1::content_length(buf) {
        let body = h1::body_length(buf);
        if body != declared {
            log::warn!(
                "response body length {} differs from Content-Length {}",
                body,
                declared
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    const HELLO: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 13\r\n\r\nHello, world!";

    #[tokio::test]
    async fn stops_when_declared_length_arrives() {
        let (client, mut server) = duplex(64 * 1024);
        let conn = HttpConnection::new(client, 1 << 20);
        server.write_all(HELLO).await.unwrap();
        // server stays open: completion must come from the length check
        let received = conn.receive(ReceiveMode::UntilComplete).await;
        assert!(matches!(received.end, ReceiveEnd::Complete));
        assert_eq!(&received.data[..], HELLO);
        drop(server);
    }

    #[tokio::test]
    async fn response_split_across_reads() {
        let (client, mut server) = duplex(64 * 1024);
        let conn = HttpConnection::new(client, 1 << 20);
        let writer = tokio::spawn(async move {
            for piece in HELLO.chunks(7) {
                server.write_all(piece).await.unwrap();
                tokio::task::yield_now().await;
            }
            server
        });
        let received = conn.receive(ReceiveMode::UntilComplete).await;
        assert!(matches!(received.end, ReceiveEnd::Complete));
        assert_eq!(received.data.len(), HELLO.len());
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn length_less_body_ends_on_close() {
        let (client, mut server) = duplex(64 * 1024);
        let conn = HttpConnection::new(client, 1 << 20);
        server
            .write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nstreamed")
            .await
            .unwrap();
        drop(server);
        let received = conn.receive(ReceiveMode::UntilComplete).await;
        assert!(matches!(received.end, ReceiveEnd::Closed));
        assert!(received.data.ends_with(b"streamed"));
    }

    #[tokio::test]
    async fn non_200_stops_after_header_block() {
        let (client, mut server) = duplex(64 * 1024);
        let conn = HttpConnection::new(client, 1 << 20);
        server
            .write_all(b"HTTP/1.1 301 Moved Permanently\r\nLocation: http://example.com/\r\n\r\n")
            .await
            .unwrap();
        let received = conn.receive(ReceiveMode::UntilComplete).await;
        assert!(matches!(received.end, ReceiveEnd::ErrorStatus));
        assert_eq!(h1::status_code(&received.data), 301);
        drop(server);
    }

    #[tokio::test]
    async fn until_close_ignores_completeness() {
        let (client, mut server) = duplex(64 * 1024);
        let conn = HttpConnection::new(client, 1 << 20);
        let writer = tokio::spawn(async move {
            server.write_all(HELLO).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(server);
        });
        let received = conn.receive(ReceiveMode::UntilClose).await;
        assert!(matches!(received.end, ReceiveEnd::Closed));
        assert_eq!(&received.data[..], HELLO);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn ceiling_fails_the_receive() {
        let (client, mut server) = duplex(64 * 1024);
        let conn = HttpConnection::new(client, 16);
        server.write_all(HELLO).await.unwrap();
        let received = conn.receive(ReceiveMode::UntilComplete).await;
        assert!(matches!(
            received.end,
            ReceiveEnd::Failed(FetchError::ResponseTooLarge { limit: 16 })
        ));
        assert_eq!(received.data.len(), 16);
        drop(server);
    }

    #[tokio::test]
    async fn response_filling_the_ceiling_ends_on_close() {
        const EXACT: &[u8] = b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nexact";
        let (client, mut server) = duplex(64 * 1024);
        let conn = HttpConnection::new(client, EXACT.len());
        server.write_all(EXACT).await.unwrap();
        drop(server);
        let received = conn.receive(ReceiveMode::UntilComplete).await;
        assert!(matches!(received.end, ReceiveEnd::Closed), "{:?}", received.end);
        assert_eq!(&received.data[..], EXACT);
    }

    #[tokio::test]
    async fn deadline_bounds_a_silent_peer() {
        let (client, server) = duplex(1024);
        let conn = HttpConnection::new(client, 1 << 20)
            .with_deadline(Some(Deadline::after(Duration::from_millis(50))));
        let received = conn.receive(ReceiveMode::UntilComplete).await;
        assert!(matches!(received.end, ReceiveEnd::Failed(FetchError::Timeout(_))));
        drop(server);
    }

    #[tokio::test]
    async fn request_is_written_in_full() {
        let (client, mut server) = duplex(64 * 1024);
        let mut conn = HttpConnection::new(client, 1 << 20);
        let request = vec![b'x'; 20_000];
        let reader = tokio::spawn(async move {
            let mut got = vec![0u8; 20_000];
            server.read_exact(&mut got).await.unwrap();
            got
        });
        conn.send_request(&request).await.unwrap();
        assert_eq!(reader.await.unwrap(), request);
    }
}
