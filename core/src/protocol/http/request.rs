/*
 * request.rs
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

//! GET request: host, path, Accept, optional caller header text.
//!
//! Always HTTP/1.1 with `Connection: close`; the response end is the connection end
//! when no Content-Length is sent.

use crate::error::FetchError;

/// `User-Agent: <agent>` line (no terminator) for folding into extra header text.
pub fn user_agent_header(user_agent: &str) -> String {
    format!("User-Agent: {}", user_agent.trim())
}

/// Append a User-Agent line to optional caller header text.
pub fn fold_user_agent(extra: Option<&str>, user_agent: &str) -> String {
    let ua = user_agent_header(user_agent);
    match extra.map(|e| e.trim_end_matches(&['\r', '\n'][..])) {
        Some(e) if !e.is_empty() => format!("{}\r\n{}", e, ua),
        _ => ua,
    }
}

/// GET request builder. Validates host and path up front; `encode` produces the wire bytes.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    pub host: String,
    pub path: String,
    /// Port for the Host header; omitted from the header when it is the scheme default.
    pub port: u16,
    pub secure: bool,
    pub headers: Vec<(String, String)>,
    /// Raw header lines supplied by the caller, appended after the standard headers.
    pub extra: Option<String>,
}

impl RequestBuilder {
    /// Fails with `InvalidInput` when host or path is empty or contains CR, LF or other controls.
    pub fn get(host: &str, path: &str) -> Result<Self, FetchError> {
        if host.trim().is_empty() {
            return Err(FetchError::InvalidInput("empty host"));
        }
        if path.is_empty() {
            return Err(FetchError::InvalidInput("empty path"));
        }
        if host.trim().chars().any(|c| c.is_control() || c == ' ') {
            return Err(FetchError::InvalidInput("control character or space in host"));
        }
        if path.chars().any(char::is_control) {
            return Err(FetchError::InvalidInput("control character in path"));
        }
        Ok(Self {
            host: host.trim().to_string(),
            path: path.to_string(),
            port: 80,
            secure: false,
            headers: Vec::new(),
            extra: None,
        })
    }

    pub fn port(&mut self, port: u16, secure: bool) -> &mut Self {
        self.port = port;
        self.secure = secure;
        self
    }

    /// Add a header. Name is stored as given.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Caller header text: one or more lines, CRLF or LF separated, terminator optional.
    pub fn extra(&mut self, text: Option<&str>) -> &mut Self {
        self.extra = text.map(str::to_string);
        self
    }

    fn host_header(&self) -> String {
        if (self.secure && self.port != 443) || (!self.secure && self.port != 80) {
            format!("{}:{}", self.host, self.port)
        } else {
            self.host.clone()
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut req = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n",
            self.path,
            self.host_header()
        );
        for (k, v) in &self.headers {
            req.push_str(k);
            req.push_str(": ");
            req.push_str(v);
            req.push_str("\r\n");
        }
        if let Some(extra) = &self.extra {
            for line in extra.split('\n') {
                let line = line.trim_end_matches('\r');
                if !line.is_empty() {
                    req.push_str(line);
                    req.push_str("\r\n");
                }
            }
        }
        req.push_str("\r\n");
        req.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(req: &RequestBuilder) -> String {
        String::from_utf8(req.encode()).unwrap()
    }

    #[test]
    fn empty_inputs_rejected() {
        assert!(matches!(RequestBuilder::get("", "/"), Err(FetchError::InvalidInput(_))));
        assert!(matches!(RequestBuilder::get("   ", "/"), Err(FetchError::InvalidInput(_))));
        assert!(matches!(RequestBuilder::get("example.com", ""), Err(FetchError::InvalidInput(_))));
    }

    #[test]
    fn line_breaks_in_host_or_path_rejected() {
        let split = RequestBuilder::get("example.com", "/ HTTP/1.1\r\nX-Injected: 1\r\n\r\nGET /");
        assert!(matches!(split, Err(FetchError::InvalidInput(_))));
        assert!(matches!(
            RequestBuilder::get("example.com\r\nX-Injected: 1", "/"),
            Err(FetchError::InvalidInput(_))
        ));
        assert!(matches!(RequestBuilder::get("exa mple.com", "/"), Err(FetchError::InvalidInput(_))));
        assert!(matches!(RequestBuilder::get("example.com", "/a\tb"), Err(FetchError::InvalidInput(_))));
        assert!(RequestBuilder::get(" example.com ", "/a?b=c").is_ok());
    }

    #[test]
    fn minimal_request() {
        let mut req = RequestBuilder::get("example.com", "/index.html").unwrap();
        req.header("Accept", "text/plain");
        assert_eq!(
            text(&req),
            "GET /index.html HTTP/1.1\r\nHost: example.com\r\nConnection: close\r\nAccept: text/plain\r\n\r\n"
        );
    }

    #[test]
    fn host_header_carries_non_default_port() {
        let mut req = RequestBuilder::get("127.0.0.1", "/").unwrap();
        req.port(8080, false);
        assert!(text(&req).contains("Host: 127.0.0.1:8080\r\n"));
        req.port(443, true);
        assert!(text(&req).contains("Host: 127.0.0.1\r\n"));
    }

    #[test]
    fn extra_lines_are_normalised() {
        let mut req = RequestBuilder::get("example.com", "/").unwrap();
        req.extra(Some("X-One: 1\nX-Two: 2\r\n"));
        let t = text(&req);
        assert!(t.ends_with("X-One: 1\r\nX-Two: 2\r\n\r\n"));
        assert_eq!(t.matches("\r\n\r\n").count(), 1);
    }

    #[test]
    fn user_agent_folding() {
        assert_eq!(fold_user_agent(None, "probe/1.0"), "User-Agent: probe/1.0");
        assert_eq!(fold_user_agent(Some(""), "probe/1.0"), "User-Agent: probe/1.0");
        assert_eq!(
            fold_user_agent(Some("X-Token: abc\r\n"), "probe/1.0"),
            "X-Token: abc\r\nUser-Agent: probe/1.0"
        );
    }
}
