/*
 * runtime.rs
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

//! Process-wide tokio runtime for the blocking entry points.
//!
//! Built on first use and kept until process exit. Each blocking fetch holds a
//! `RuntimeGuard` for its duration; `active_fetches` reports how many are in flight.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::FetchError;

static RUNTIME: OnceLock<Result<Runtime, String>> = OnceLock::new();
static ACTIVE: AtomicUsize = AtomicUsize::new(0);

fn runtime() -> Result<&'static Runtime, FetchError> {
    RUNTIME
        .get_or_init(|| {
            Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("simpleget-io")
                .enable_all()
                .build()
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| FetchError::Runtime(e.clone()))
}

/// Held while a blocking fetch uses the shared runtime.
#[derive(Debug)]
pub struct RuntimeGuard {
    handle: Handle,
}

impl RuntimeGuard {
    pub fn acquire() -> Result<Self, FetchError> {
        let rt = runtime()?;
        ACTIVE.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            handle: rt.handle().clone(),
        })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        ACTIVE.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Blocking fetches currently running on the shared runtime.
pub fn active_fetches() -> usize {
    ACTIVE.load(Ordering::SeqCst)
}

/// Drive `fut` to completion on the shared runtime, blocking the calling thread.
/// Must not be called from inside a tokio runtime; use the async API there.
pub fn block_on<F: Future>(fut: F) -> Result<F::Output, FetchError> {
    if Handle::try_current().is_ok() {
        return Err(FetchError::Runtime(
            "blocking fetch called from within an async runtime".to_string(),
        ));
    }
    let guard = RuntimeGuard::acquire()?;
    let out = guard.handle().block_on(fut);
    drop(guard);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_on_runs_future() {
        assert_eq!(block_on(async { 7 }).unwrap(), 7);
    }

    #[test]
    fn guard_counts_while_held() {
        let seen = block_on(async { active_fetches() }).unwrap();
        assert!(seen >= 1);
    }

    #[tokio::test]
    async fn block_on_inside_runtime_is_refused() {
        assert!(matches!(block_on(async {}), Err(FetchError::Runtime(_))));
    }
}
