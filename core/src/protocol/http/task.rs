/*
 * task.rs
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

//! Thread-per-request fetches with a completion callback.
//!
//! `spawn_fetch` starts one named OS thread per call and returns at once. The thread runs the
//! blocking fetch and then calls the callback, exactly once, on that thread. Dropping the
//! returned `FetchTask` detaches the worker; `join` waits for it.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::protocol::http::fetch::Fetcher;
use crate::protocol::http::response::FetchResult;

static NEXT_WORKER: AtomicU64 = AtomicU64::new(1);

/// Identity of a fetch worker, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

impl WorkerId {
    fn next() -> Self {
        WorkerId(NEXT_WORKER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Http,
    Https,
    /// HTTPS with a `User-Agent` line; the request fails without one.
    HttpsWithUserAgent,
}

/// One GET to run, synchronously via `Fetcher::fetch` or on a worker via `spawn_fetch`.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub mode: FetchMode,
    pub host: String,
    pub path: String,
    pub user_agent: Option<String>,
    pub extra_header: Option<String>,
    /// Bound on the whole fetch; none means only the connect timeout applies.
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn new(mode: FetchMode, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            mode,
            host: host.into(),
            path: path.into(),
            user_agent: None,
            extra_header: None,
            timeout: None,
        }
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn extra_header(mut self, text: impl Into<String>) -> Self {
        self.extra_header = Some(text.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Handle to a running worker.
#[derive(Debug)]
pub struct FetchTask {
    id: WorkerId,
    handle: JoinHandle<()>,
}

impl FetchTask {
    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker, callback included.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

/// Run `request` on a new thread and hand the result to `callback` there.
/// Fails only if the thread cannot be spawned; the callback is then never called.
pub fn spawn_fetch<F>(fetcher: Arc<Fetcher>, request: FetchRequest, callback: F) -> io::Result<FetchTask>
where
    F: FnOnce(WorkerId, FetchResult) + Send + 'static,
{
    let id = WorkerId::next();
    let handle = thread::Builder::new()
        .name(format!("simpleget-worker-{}", id))
        .spawn(move || {
            log::debug!("worker {} fetching {}{}", id, request.host, request.path);
            let result = fetcher.fetch(&request);
            callback(id, result);
        })?;
    Ok(FetchTask { id, handle })
}
