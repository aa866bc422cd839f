/*
 * response.rs
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

//! Result of one GET: status, byte counts, and a tagged outcome.

use bytes::Bytes;

use crate::error::FetchError;
use crate::protocol::http::h1;

/// What the fetch produced.
#[derive(Debug)]
pub enum FetchOutcome {
    /// 200 response; header stripped.
    Body(Bytes),
    /// Non-200 response. The body is not kept, only the Location value if any.
    ErrorStatus { location: Option<String> },
    Failed(FetchError),
}

/// Returned by every fetch entry point. Failures are reported here, never as `Err`.
#[derive(Debug)]
pub struct FetchResult {
    /// Parsed status, 0 when no status line was seen.
    pub status_code: u16,
    /// Raw bytes read, header included.
    pub total_bytes_received: usize,
    /// Bytes after the header boundary.
    pub body_bytes_received: usize,
    /// Content-Length of a 200 response, 0 when absent.
    pub declared_content_length: usize,
    pub outcome: FetchOutcome,
}

impl FetchResult {
    /// Empty result: nothing received.
    pub fn failed(err: FetchError) -> Self {
        Self {
            status_code: 0,
            total_bytes_received: 0,
            body_bytes_received: 0,
            declared_content_length: 0,
            outcome: FetchOutcome::Failed(err),
        }
    }

    /// Counts taken from the raw response bytes.
    pub fn measure(raw: &[u8], outcome: FetchOutcome) -> Self {
        Self {
            status_code: h1::status_code(raw),
            total_bytes_received: raw.len(),
            body_bytes_received: h1::body_length(raw),
            declared_content_length: h1::declared_content_length(raw),
            outcome,
        }
    }

    /// Payload for `Body`, Location bytes for `ErrorStatus`, `None` for failures.
    pub fn body(&self) -> Option<&[u8]> {
        match &self.outcome {
            FetchOutcome::Body(b) => Some(&b[..]),
            FetchOutcome::ErrorStatus { location } => location.as_deref().map(str::as_bytes),
            FetchOutcome::Failed(_) => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match &self.outcome {
            FetchOutcome::ErrorStatus { location } => location.as_deref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.outcome {
            FetchOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Body(_))
    }

    /// Take the payload of a successful fetch.
    pub fn into_body(self) -> Option<Bytes> {
        match self.outcome {
            FetchOutcome::Body(b) => Some(b),
            _ => None,
        }
    }
}
