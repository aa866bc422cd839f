/*
 * error.rs
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

//! Fetch errors.
//!
//! Every failure of a GET is one of these. The fetch entry points never return
//! them directly: they are folded into `FetchOutcome::Failed` so the caller
//! always gets a result record with whatever status and byte counts were seen.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors from connect, send, receive, or response validation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Empty host or path; nothing was opened.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// Address lookup failed or returned no candidates.
    #[error("cannot resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    /// No resolved address accepted the connection.
    #[error("cannot connect to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: io::Error,
    },

    /// TLS configuration or handshake failure.
    #[error("TLS setup with {host} failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: io::Error,
    },

    /// Writing the request failed.
    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    /// Unexpected socket error while reading the response.
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    /// Stream ended before the declared Content-Length was received.
    #[error("incomplete response: {received} of {declared} body bytes")]
    Incomplete { received: usize, declared: usize },

    /// Nothing parseable as an HTTP response was received.
    #[error("invalid response: {0}")]
    InvalidResponse(&'static str),

    /// The response did not fit in the configured receive ceiling.
    #[error("response exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },

    /// The call did not finish within its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The shared runtime could not be started.
    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

impl FetchError {
    /// True for failures that happened before any byte reached the server.
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            FetchError::InvalidInput(_)
                | FetchError::Resolve { .. }
                | FetchError::Connect { .. }
                | FetchError::Tls { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_host() {
        let e = FetchError::Resolve {
            host: "nowhere.invalid".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such host"),
        };
        let s = e.to_string();
        assert!(s.contains("nowhere.invalid"));
        assert!(s.contains("no such host"));
    }

    #[test]
    fn connect_failures_classified() {
        assert!(FetchError::InvalidInput("empty host").is_connect_failure());
        assert!(!FetchError::Incomplete { received: 1, declared: 2 }.is_connect_failure());
        assert!(!FetchError::Timeout(Duration::from_millis(5)).is_connect_failure());
    }
}
