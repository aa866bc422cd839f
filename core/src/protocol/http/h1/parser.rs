/*
 * parser.rs
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

//! HTTP/1.1 response framing over an accumulated byte buffer: status code, header boundary,
//! Content-Length, completeness, header stripping and Location extraction.
//!
//! All functions are pure and take the whole response received so far. They are re-run after
//! every read, so partial input (half a status line, headers without the blank line) must
//! yield "not yet" answers rather than wrong ones.

/// Blank line terminating the header block.
pub const HEADER_END: &[u8] = b"\r\n\r\n";

const STATUS_PREFIX: &[u8] = b"HTTP/";

/// Content-Length header as seen in a complete header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentLength {
    /// No header, or header block not yet complete.
    Absent,
    Declared(usize),
    /// Header present but not a decimal number; treated as unknown length.
    Malformed,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Find CRLF in buf; return number of bytes to the start of CRLF, or None if not found.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    find(buf, b"\r\n")
}

/// Complete header lines after the status line (up to the boundary, or to the last CRLF seen).
fn header_lines(buf: &[u8]) -> impl Iterator<Item = &[u8]> {
    let head = match find(buf, HEADER_END) {
        Some(end) => &buf[..end + 2],
        None => &buf[..buf.len() - buf.iter().rev().take_while(|&&b| b != b'\n').count()],
    };
    let after_status = match find_crlf(head) {
        Some(n) => &head[n + 2..],
        None => &[][..],
    };
    after_status
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
}

/// Value of the first header named `name` (case-insensitive), trimmed. Only complete lines count.
pub fn header_value<'a>(buf: &'a [u8], name: &str) -> Option<&'a str> {
    header_lines(buf).find_map(|line| {
        let colon = line.iter().position(|&b| b == b':')?;
        let (key, rest) = line.split_at(colon);
        if !key.eq_ignore_ascii_case(name.as_bytes()) {
            return None;
        }
        std::str::from_utf8(&rest[1..]).ok().map(str::trim)
    })
}

/// Status code from the status line; 0 until a full `HTTP/x.y NNN` line has arrived.
pub fn status_code(buf: &[u8]) -> u16 {
    if !buf.starts_with(STATUS_PREFIX) {
        return 0;
    }
    let line_end = match find_crlf(buf) {
        Some(n) => n,
        None => return 0,
    };
    let line = match std::str::from_utf8(&buf[..line_end]) {
        Ok(s) => s,
        Err(_) => return 0,
    };
    // HTTP/1.1 200 OK or HTTP/1.1 200
    let parts: Vec<&str> = line.splitn(3, ' ').collect();
    parts
        .get(1)
        .filter(|s| s.len() == 3)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0)
}

pub fn is_ok(buf: &[u8]) -> bool {
    status_code(buf) == 200
}

/// Offset of the first byte after the header block; 0 if the blank line has not been seen.
pub fn header_boundary_length(buf: &[u8]) -> usize {
    find(buf, HEADER_END).map(|n| n + HEADER_END.len()).unwrap_or(0)
}

/// Bytes after the header boundary; 0 while there is no boundary.
pub fn body_length(buf: &[u8]) -> usize {
    match header_boundary_length(buf) {
        0 => 0,
        n => buf.len() - n,
    }
}

/// Content-Length of a complete header block, regardless of status.
pub fn content_length(buf: &[u8]) -> ContentLength {
    if header_boundary_length(buf) == 0 {
        return ContentLength::Absent;
    }
    match header_value(buf, "Content-Length") {
        None => ContentLength::Absent,
        Some(v) => match v.parse::<usize>() {
            Ok(n) => ContentLength::Declared(n),
            Err(_) => ContentLength::Malformed,
        },
    }
}

/// Declared length of a 200 response with a complete header block; 0 otherwise.
pub fn declared_content_length(buf: &[u8]) -> usize {
    if !is_ok(buf) {
        return 0;
    }
    match content_length(buf) {
        ContentLength::Declared(n) => n,
        _ => 0,
    }
}

/// True when a 200 response has its full header block and exactly the declared body length.
/// Responses without a usable Content-Length are never complete here; they end on close.
pub fn is_complete(buf: &[u8]) -> bool {
    if !is_ok(buf) {
        return false;
    }
    let boundary = header_boundary_length(buf);
    if boundary == 0 {
        return false;
    }
    match content_length(buf) {
        ContentLength::Declared(n) => buf.len() - boundary == n,
        _ => false,
    }
}

/// Body of a 200 response with a complete header block; anything else is returned unchanged.
pub fn strip_header(buf: &[u8]) -> &[u8] {
    if !is_ok(buf) {
        return buf;
    }
    match header_boundary_length(buf) {
        0 => buf,
        n => &buf[n..],
    }
}

/// Location header value of a (typically 3xx) response, without the line terminator.
pub fn extract_redirect_target(buf: &[u8]) -> Option<String> {
    header_value(buf, "Location")
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
