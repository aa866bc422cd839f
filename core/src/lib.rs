/*
 * lib.rs
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

//! SimpleGet core: HTTP and HTTPS GET with a plain result record.
//!
//! The free functions use the process-wide `FetchConfig` (see `config::set_default_config`).
//! Use `Fetcher` directly for a private config or a custom `Connect`.

pub mod config;
pub mod error;
pub mod net;
pub mod protocol;
pub mod runtime;

use std::io;
use std::sync::Arc;
use std::time::Duration;

pub use config::{default_config, set_default_config, FetchConfig};
pub use error::FetchError;
pub use protocol::http::{
    spawn_fetch, FetchMode, FetchOutcome, FetchRequest, FetchResult, FetchTask, Fetcher, WorkerId,
};
pub use runtime::active_fetches;

fn default_fetcher() -> Fetcher {
    Fetcher::new(default_config())
}

/// Blocking plain HTTP GET.
pub fn fetch_http(host: &str, path: &str, extra: Option<&str>) -> FetchResult {
    default_fetcher().fetch_http(host, path, extra)
}

/// Blocking HTTPS GET.
pub fn fetch_https(host: &str, path: &str, extra: Option<&str>) -> FetchResult {
    default_fetcher().fetch_https(host, path, extra)
}

pub fn fetch_https_with_user_agent(
    host: &str,
    path: &str,
    user_agent: Option<&str>,
    extra: Option<&str>,
) -> FetchResult {
    default_fetcher().fetch_https_with_user_agent(host, path, user_agent, extra)
}

/// True if a plain GET of the connectivity host returns a body.
pub fn check_connectivity() -> bool {
    default_fetcher().check_connectivity()
}

/// Fire-and-forget fetch. A `timeout_ms` of 0 means no overall deadline.
pub fn fetch_async<F>(
    mode: FetchMode,
    host: &str,
    path: &str,
    user_agent: Option<&str>,
    extra: Option<&str>,
    timeout_ms: u64,
    callback: F,
) -> io::Result<FetchTask>
where
    F: FnOnce(WorkerId, FetchResult) + Send + 'static,
{
    let mut request = FetchRequest::new(mode, host, path);
    request.user_agent = user_agent.map(str::to_string);
    request.extra_header = extra.map(str::to_string);
    if timeout_ms > 0 {
        request.timeout = Some(Duration::from_millis(timeout_ms));
    }
    spawn_fetch(Arc::new(default_fetcher()), request, callback)
}
