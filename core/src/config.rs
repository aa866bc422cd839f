/*
 * config.rs
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

//! Fetch configuration: ports, timeouts, receive ceiling, TLS verification policy.
//! Loadable from JSON (every field optional, missing fields take the defaults).

use std::sync::{OnceLock, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default ceiling for one response, header included.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

/// Bound on resolution + connect + TLS handshake.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 15_000;

/// Host probed by `check_connectivity`.
pub const DEFAULT_CONNECTIVITY_HOST: &str = "www.google.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub http_port: u16,
    pub https_port: u16,
    pub connect_timeout_ms: u64,
    /// Bound on a whole fetch when the call gives none; 0 means unbounded.
    pub request_timeout_ms: u64,
    pub max_response_bytes: usize,
    /// Value of the Accept request header.
    pub accept: String,
    /// Off by default: the library has always skipped chain verification.
    pub verify_certificates: bool,
    pub connectivity_host: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            http_port: 80,
            https_port: 443,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: 0,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            accept: "text/plain".to_string(),
            verify_certificates: false,
            connectivity_host: DEFAULT_CONNECTIVITY_HOST.to_string(),
        }
    }
}

impl FetchConfig {
    /// Parse a JSON object; unknown fields are rejected so typos surface.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    pub fn with_https_port(mut self, port: u16) -> Self {
        self.https_port = port;
        self
    }

    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    pub fn with_verify_certificates(mut self, verify: bool) -> Self {
        self.verify_certificates = verify;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn with_connectivity_host(mut self, host: impl Into<String>) -> Self {
        self.connectivity_host = host.into();
        self
    }
}

static DEFAULT_CONFIG: OnceLock<RwLock<FetchConfig>> = OnceLock::new();

fn default_cell() -> &'static RwLock<FetchConfig> {
    DEFAULT_CONFIG.get_or_init(|| RwLock::new(FetchConfig::default()))
}

/// Process-wide config used by the free fetch functions.
pub fn default_config() -> FetchConfig {
    match default_cell().read() {
        Ok(c) => c.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Replace the process-wide config. Fetches already running keep the config they started with.
pub fn set_default_config(config: FetchConfig) {
    match default_cell().write() {
        Ok(mut c) => *c = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_legacy_behaviour() {
        let c = FetchConfig::default();
        assert_eq!(c.http_port, 80);
        assert_eq!(c.https_port, 443);
        assert_eq!(c.accept, "text/plain");
        assert!(!c.verify_certificates);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = FetchConfig::from_json(r#"{"http_port":8080,"verify_certificates":true}"#).unwrap();
        assert_eq!(c.http_port, 8080);
        assert!(c.verify_certificates);
        assert_eq!(c.https_port, 443);
        assert_eq!(c.max_response_bytes, DEFAULT_MAX_RESPONSE_BYTES);
    }

    #[test]
    fn request_timeout_zero_is_unbounded() {
        assert_eq!(FetchConfig::default().request_timeout(), None);
        let c = FetchConfig::from_json(r#"{"request_timeout_ms":250}"#).unwrap();
        assert_eq!(c.request_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(FetchConfig::from_json("{\"http_port\": \"eighty\"}").is_err());
    }

    #[test]
    fn json_roundtrip_preserves_overrides() {
        let c = FetchConfig::default()
            .with_http_port(8081)
            .with_connect_timeout(Duration::from_secs(2));
        let back = FetchConfig::from_json(&c.to_json()).unwrap();
        assert_eq!(back, c);
        assert_eq!(back.connect_timeout(), Duration::from_secs(2));
    }
}
