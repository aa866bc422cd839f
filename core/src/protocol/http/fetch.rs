/*
 * fetch.rs
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

//! Fetch engine: build the request, connect, send, receive, shape the result.
//!
//! `Fetcher` owns a config and a `Connect` implementation. The async methods run on any
//! tokio runtime; the `fetch_*` methods block the calling thread on the shared runtime.
//! Every path returns a `FetchResult`, and the transport is dropped before it does.

use std::sync::Arc;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::protocol::http::client::{Connect, Scheme, TcpConnector};
use crate::protocol::http::connection::{
    within, Deadline, HttpConnection, ReceiveEnd, ReceiveMode, Received,
};
use crate::protocol::http::h1;
use crate::protocol::http::request::{fold_user_agent, RequestBuilder};
use crate::protocol::http::response::{FetchOutcome, FetchResult};
use crate::protocol::http::task::{FetchMode, FetchRequest};
use crate::runtime;

pub struct Fetcher {
    config: FetchConfig,
    connector: Arc<dyn Connect>,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(FetchConfig::default())
    }
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Self {
        let connector = Arc::new(TcpConnector::new(&config));
        Self { config, connector }
    }

    /// Use a custom transport (tests, proxies).
    pub fn with_connector(config: FetchConfig, connector: Arc<dyn Connect>) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET `path` from `host`. `extra` is raw header text appended to the request.
    pub async fn get(
        &self,
        scheme: Scheme,
        host: &str,
        path: &str,
        extra: Option<&str>,
    ) -> FetchResult {
        self.run(scheme, host, path, extra, None).await
    }

    /// Run a described fetch, applying its mode and timeout.
    pub async fn execute(&self, request: &FetchRequest) -> FetchResult {
        let (scheme, extra) = match resolve_mode(request) {
            Ok(v) => v,
            Err(e) => return FetchResult::failed(e),
        };
        self.run(
            scheme,
            &request.host,
            &request.path,
            extra.as_deref(),
            request.timeout,
        )
        .await
    }

    async fn run(
        &self,
        scheme: Scheme,
        host: &str,
        path: &str,
        extra: Option<&str>,
        timeout: Option<Duration>,
    ) -> FetchResult {
        let deadline = timeout.or_else(|| self.config.request_timeout()).map(Deadline::after);
        let port = scheme.port(&self.config);
        let mut builder = match RequestBuilder::get(host, path) {
            Ok(b) => b,
            Err(e) => return FetchResult::failed(e),
        };
        builder
            .port(port, scheme.is_secure())
            .header("Accept", self.config.accept.as_str())
            .extra(extra);
        let request = builder.encode();

        let stream = match within(deadline, self.connector.connect(&builder.host, port, scheme)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) | Err(e) => {
                log::debug!("GET {}{} not connected: {}", builder.host, path, e);
                return FetchResult::failed(e);
            }
        };
        let mode = if stream.is_secure() {
            ReceiveMode::UntilClose
        } else {
            ReceiveMode::UntilComplete
        };
        let mut conn =
            HttpConnection::new(stream, self.config.max_response_bytes).with_deadline(deadline);
        if let Err(e) = conn.send_request(&request).await {
            return FetchResult::failed(e);
        }
        let result = finish(conn.receive(mode).await);
        log::debug!(
            "GET {}{} -> status {}, {} bytes",
            builder.host,
            path,
            result.status_code,
            result.total_bytes_received
        );
        result
    }

    fn blocking<F>(fut: F) -> FetchResult
    where
        F: std::future::Future<Output = FetchResult>,
    {
        runtime::block_on(fut).unwrap_or_else(FetchResult::failed)
    }

    /// Blocking plain GET. Only `FetchConfig::request_timeout_ms` bounds it after connect;
    /// with the default of 0 a peer that accepts and stays silent blocks the caller.
    pub fn fetch_http(&self, host: &str, path: &str, extra: Option<&str>) -> FetchResult {
        Self::blocking(self.get(Scheme::Http, host, path, extra))
    }

    /// Blocking TLS GET, bounded like `fetch_http`.
    pub fn fetch_https(&self, host: &str, path: &str, extra: Option<&str>) -> FetchResult {
        Self::blocking(self.get(Scheme::Https, host, path, extra))
    }

    /// HTTPS GET with a `User-Agent` line folded into `extra`. No user agent, no request.
    pub fn fetch_https_with_user_agent(
        &self,
        host: &str,
        path: &str,
        user_agent: Option<&str>,
        extra: Option<&str>,
    ) -> FetchResult {
        let user_agent = match user_agent.map(str::trim).filter(|ua| !ua.is_empty()) {
            Some(ua) => ua,
            None => return FetchResult::failed(FetchError::InvalidInput("missing user agent")),
        };
        let extra = fold_user_agent(extra, user_agent);
        self.fetch_https(host, path, Some(&extra))
    }

    /// Blocking form of `execute`.
    pub fn fetch(&self, request: &FetchRequest) -> FetchResult {
        Self::blocking(self.execute(request))
    }

    /// Plain GET of `/` on the connectivity host; true if anything came back as a body.
    pub fn check_connectivity(&self) -> bool {
        let result = self.fetch_http(&self.config.connectivity_host, "/", None);
        result.body().is_some()
    }
}

fn resolve_mode(request: &FetchRequest) -> Result<(Scheme, Option<String>), FetchError> {
    match request.mode {
        FetchMode::Http => Ok((Scheme::Http, request.extra_header.clone())),
        FetchMode::Https => Ok((Scheme::Https, request.extra_header.clone())),
        FetchMode::HttpsWithUserAgent => {
            let ua = request
                .user_agent
                .as_deref()
                .map(str::trim)
                .filter(|ua| !ua.is_empty())
                .ok_or(FetchError::InvalidInput("missing user agent"))?;
            Ok((
                Scheme::Https,
                Some(fold_user_agent(request.extra_header.as_deref(), ua)),
            ))
        }
    }
}

/// Turn raw bytes and the receive end into a result.
fn finish(received: Received) -> FetchResult {
    let Received { data, end } = received;
    if let ReceiveEnd::Failed(e) = end {
        log::debug!("receive failed after {} bytes: {}", data.len(), e);
        return FetchResult::measure(&data, FetchOutcome::Failed(e));
    }
    let status = h1::status_code(&data);
    if status == 200 {
        let boundary = h1::header_boundary_length(&data);
        if boundary == 0 {
            return FetchResult::measure(
                &data,
                FetchOutcome::Failed(FetchError::InvalidResponse("header block not terminated")),
            );
        }
        let usable = match h1::content_length(&data) {
            h1::ContentLength::Declared(_) => h1::is_complete(&data),
            h1::ContentLength::Malformed => {
                log::warn!("malformed Content-Length, reading body to end of stream");
                true
            }
            h1::ContentLength::Absent => true,
        };
        if !usable {
            let outcome = FetchOutcome::Failed(FetchError::Incomplete {
                received: h1::body_length(&data),
                declared: h1::declared_content_length(&data),
            });
            return FetchResult::measure(&data, outcome);
        }
        let data = data.freeze();
        let body = data.slice(boundary..);
        return FetchResult::measure(&data, FetchOutcome::Body(body));
    }
    if status != 0 {
        let location = h1::extract_redirect_target(&data);
        return FetchResult::measure(&data, FetchOutcome::ErrorStatus { location });
    }
    let reason = if data.is_empty() {
        "empty response"
    } else {
        "missing status line"
    };
    FetchResult::measure(&data, FetchOutcome::Failed(FetchError::InvalidResponse(reason)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::http::client::ConnectFuture;
    use bytes::BytesMut;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingConnector {
        attempts: AtomicUsize,
    }

    impl Connect for CountingConnector {
        fn connect<'a>(&'a self, host: &'a str, _port: u16, _scheme: Scheme) -> ConnectFuture<'a> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Err(FetchError::Connect {
                    host: host.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "counting"),
                })
            })
        }
    }

    fn counting() -> (Arc<CountingConnector>, Fetcher) {
        let connector = Arc::new(CountingConnector {
            attempts: AtomicUsize::new(0),
        });
        let fetcher = Fetcher::with_connector(FetchConfig::default(), connector.clone());
        (connector, fetcher)
    }

    fn received(raw: &[u8], end: ReceiveEnd) -> Received {
        Received {
            data: BytesMut::from(raw),
            end,
        }
    }

    #[test]
    fn invalid_input_never_connects() {
        let (connector, fetcher) = counting();
        for (host, path) in [("", "/"), ("example.com", ""), ("  ", "/x")] {
            let r = fetcher.fetch_http(host, path, None);
            assert_eq!(r.status_code, 0);
            assert!(r.body().is_none());
            let r = fetcher.fetch_https(host, path, None);
            assert!(matches!(r.error(), Some(FetchError::InvalidInput(_))));
        }
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_user_agent_never_connects() {
        let (connector, fetcher) = counting();
        let r = fetcher.fetch_https_with_user_agent("example.com", "/", None, None);
        assert!(matches!(r.error(), Some(FetchError::InvalidInput(_))));
        let request = FetchRequest::new(FetchMode::HttpsWithUserAgent, "example.com", "/");
        assert!(fetcher.fetch(&request).error().is_some());
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn connect_failure_is_an_empty_result() {
        let (connector, fetcher) = counting();
        let r = fetcher.fetch_http("example.com", "/", None);
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(r.status_code, 0);
        assert_eq!(r.total_bytes_received, 0);
        assert!(matches!(r.error(), Some(FetchError::Connect { .. })));
    }

    #[test]
    fn finish_strips_header_of_complete_200() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 13\r\n\r\nHello, world!";
        let r = finish(received(raw, ReceiveEnd::Complete));
        assert_eq!(r.status_code, 200);
        assert_eq!(r.declared_content_length, 13);
        assert_eq!(r.body_bytes_received, 13);
        assert_eq!(r.body(), Some(&b"Hello, world!"[..]));
    }

    #[test]
    fn finish_rejects_short_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 13\r\n\r\nHello";
        let r = finish(received(raw, ReceiveEnd::Closed));
        assert_eq!(r.status_code, 200);
        assert_eq!(r.body_bytes_received, 5);
        assert!(r.body().is_none());
        assert!(matches!(
            r.error(),
            Some(FetchError::Incomplete {
                received: 5,
                declared: 13
            })
        ));
    }

    #[test]
    fn finish_accepts_close_delimited_and_malformed_length() {
        let raw = b"HTTP/1.1 200 OK\r\n\r\nstream";
        assert_eq!(finish(received(raw, ReceiveEnd::Closed)).body(), Some(&b"stream"[..]));
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: lots\r\n\r\nstream";
        let r = finish(received(raw, ReceiveEnd::Closed));
        assert_eq!(r.declared_content_length, 0);
        assert_eq!(r.body(), Some(&b"stream"[..]));
    }

    #[test]
    fn finish_keeps_location_of_error_status() {
        let raw = b"HTTP/1.1 301 Moved Permanently\r\nLocation: http://example.com/\r\n\r\n";
        let r = finish(received(raw, ReceiveEnd::ErrorStatus));
        assert_eq!(r.status_code, 301);
        assert_eq!(r.body(), Some(&b"http://example.com/"[..]));
        let r = finish(received(b"HTTP/1.1 404 Not Found\r\n\r\n", ReceiveEnd::ErrorStatus));
        assert_eq!(r.status_code, 404);
        assert!(r.body().is_none());
        assert!(r.error().is_none());
    }

    #[test]
    fn finish_keeps_counts_on_failure() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial";
        let r = finish(received(raw, ReceiveEnd::Failed(FetchError::Timeout(Duration::from_millis(5)))));
        assert_eq!(r.status_code, 200);
        assert_eq!(r.total_bytes_received, raw.len());
        assert!(matches!(r.error(), Some(FetchError::Timeout(_))));
    }

    #[test]
    fn finish_without_status_line() {
        let r = finish(received(b"", ReceiveEnd::Closed));
        assert!(matches!(r.error(), Some(FetchError::InvalidResponse("empty response"))));
        let r = finish(received(b"SSH-2.0-OpenSSH\r\n", ReceiveEnd::Closed));
        assert!(matches!(r.error(), Some(FetchError::InvalidResponse("missing status line"))));
    }
}
