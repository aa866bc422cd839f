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

//! C ABI for SimpleGet core.
//!
//! Every GET returns an `HttpData` by value. `data` is malloc'd and NUL-terminated (the
//! terminator is not counted in `data_length`); release it with `http_data_free`.
//! All string parameters are UTF-8 NUL-terminated. NULL `add_info` means no extra header.

use libc::{c_char, c_int, c_void, size_t};
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::ptr;
use std::sync::Arc;
use std::time::Duration;

use simpleget_core::protocol::http::{spawn_fetch, FetchMode, FetchRequest, Fetcher};
use simpleget_core::{default_config, set_default_config, FetchConfig, FetchError, FetchResult};

/// Result record handed to C callers.
#[repr(C)]
pub struct HttpData {
    pub http_code: c_int,
    pub received_bytes: size_t,
    pub received_data_length: size_t,
    pub content_length: size_t,
    /// Body on 200, Location value on other statuses, NULL on failure.
    pub data: *mut c_char,
    pub data_length: size_t,
}

/// Selector for `http_get_with_thread`, matching the C enum order.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum HttpCommand {
    GetHttp = 0,
    GetHttps = 1,
    GetHttpsUserAgent = 2,
}

pub type HttpCallback = extern "C" fn(c_int, HttpData);

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = RefCell::new(None);
}

fn set_last_error(err: &FetchError) {
    let msg = CString::new(err.to_string()).unwrap_or_else(|_| CString::from(c"(error)"));
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

static LOGGER: once_cell::sync::OnceCell<()> = once_cell::sync::OnceCell::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .try_init();
    });
}

fn on_entry() {
    if cfg!(feature = "diagnostic") {
        init_logging();
    }
}

fn ptr_to_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string()) }
}

/// Copy `bytes` into a malloc'd, NUL-terminated buffer.
fn malloc_bytes(bytes: &[u8]) -> *mut c_char {
    unsafe {
        let p = libc::malloc(bytes.len() + 1) as *mut u8;
        if p.is_null() {
            return ptr::null_mut();
        }
        ptr::copy_nonoverlapping(bytes.as_ptr(), p, bytes.len());
        *p.add(bytes.len()) = 0;
        p as *mut c_char
    }
}

fn to_http_data(result: &FetchResult) -> HttpData {
    match result.error() {
        Some(e) => {
            log::debug!("fetch failed: {}", e);
            set_last_error(e);
        }
        None => clear_last_error(),
    }
    let mut out = HttpData {
        http_code: c_int::from(result.status_code),
        received_bytes: result.total_bytes_received,
        received_data_length: result.body_bytes_received,
        content_length: result.declared_content_length,
        data: ptr::null_mut(),
        data_length: 0,
    };
    if let Some(body) = result.body() {
        out.data = malloc_bytes(body);
        if !out.data.is_null() {
            out.data_length = body.len();
        }
    }
    out
}

fn fetcher() -> Fetcher {
    Fetcher::new(default_config())
}

/// Plain HTTP GET of `file` from `host`.
#[no_mangle]
pub unsafe extern "C" fn http_get(
    host: *const c_char,
    file: *const c_char,
    add_info: *const c_char,
) -> HttpData {
    on_entry();
    let (host, file) = (ptr_to_str(host).unwrap_or_default(), ptr_to_str(file).unwrap_or_default());
    let extra = ptr_to_str(add_info);
    to_http_data(&fetcher().fetch_http(&host, &file, extra.as_deref()))
}

/// HTTPS GET of `file` from `host`.
#[no_mangle]
pub unsafe extern "C" fn https_get(
    host: *const c_char,
    file: *const c_char,
    add_info: *const c_char,
) -> HttpData {
    on_entry();
    let (host, file) = (ptr_to_str(host).unwrap_or_default(), ptr_to_str(file).unwrap_or_default());
    let extra = ptr_to_str(add_info);
    to_http_data(&fetcher().fetch_https(&host, &file, extra.as_deref()))
}

/// HTTPS GET with a User-Agent header. NULL `user_agent` returns an empty record without connecting.
#[no_mangle]
pub unsafe extern "C" fn https_get_with_useragent(
    host: *const c_char,
    file: *const c_char,
    user_agent: *const c_char,
    add_info: *const c_char,
) -> HttpData {
    on_entry();
    let (host, file) = (ptr_to_str(host).unwrap_or_default(), ptr_to_str(file).unwrap_or_default());
    let user_agent = ptr_to_str(user_agent);
    let extra = ptr_to_str(add_info);
    to_http_data(&fetcher().fetch_https_with_user_agent(
        &host,
        &file,
        user_agent.as_deref(),
        extra.as_deref(),
    ))
}

/// Run a GET on a new thread and call `callback(worker_id, data)` from that thread.
/// Returns the worker id, or -1 if `command` is unknown or the thread could not start.
/// `timeout_ms` of 0 means no overall deadline.
#[no_mangle]
pub unsafe extern "C" fn http_get_with_thread(
    command: c_int,
    host: *const c_char,
    file: *const c_char,
    user_agent: *const c_char,
    add_info: *const c_char,
    timeout_ms: u64,
    callback: HttpCallback,
) -> c_int {
    on_entry();
    let mode = match command {
        c if c == HttpCommand::GetHttp as c_int => FetchMode::Http,
        c if c == HttpCommand::GetHttps as c_int => FetchMode::Https,
        c if c == HttpCommand::GetHttpsUserAgent as c_int => FetchMode::HttpsWithUserAgent,
        _ => {
            set_last_error(&FetchError::InvalidInput("unknown command"));
            return -1;
        }
    };
    let mut request = FetchRequest::new(
        mode,
        ptr_to_str(host).unwrap_or_default(),
        ptr_to_str(file).unwrap_or_default(),
    );
    request.user_agent = ptr_to_str(user_agent);
    request.extra_header = ptr_to_str(add_info);
    if timeout_ms > 0 {
        request.timeout = Some(Duration::from_millis(timeout_ms));
    }
    let spawned = spawn_fetch(Arc::new(fetcher()), request, move |id, result| {
        callback(worker_code(id.as_u64()), to_http_data(&result));
    });
    match spawned {
        Ok(task) => worker_code(task.id().as_u64()),
        Err(e) => {
            log::warn!("cannot start fetch worker: {}", e);
            set_last_error(&FetchError::Runtime(e.to_string()));
            -1
        }
    }
}

fn worker_code(id: u64) -> c_int {
    (id & 0x7fff_ffff) as c_int
}

/// True if a plain GET of the connectivity host returns anything as a body.
#[no_mangle]
pub extern "C" fn socket_check_connection() -> bool {
    on_entry();
    fetcher().check_connectivity()
}

/// Free `data` in a record from any GET. Safe on an empty record; clears the pointer.
#[no_mangle]
pub unsafe extern "C" fn http_data_free(data: *mut HttpData) {
    if data.is_null() {
        return;
    }
    let d = &mut *data;
    if !d.data.is_null() {
        libc::free(d.data as *mut c_void);
        d.data = ptr::null_mut();
        d.data_length = 0;
    }
}

/// Replace the process-wide config from a JSON object. Returns 0 on success, -1 on error
/// (see `simpleget_last_error`); the config is unchanged on error.
#[no_mangle]
pub unsafe extern "C" fn simpleget_configure(json: *const c_char) -> c_int {
    on_entry();
    let json = match ptr_to_str(json) {
        Some(s) => s,
        None => {
            set_last_error(&FetchError::InvalidInput("config is null or not valid UTF-8"));
            return -1;
        }
    };
    match FetchConfig::from_json(&json) {
        Ok(config) => {
            set_default_config(config);
            clear_last_error();
            0
        }
        Err(e) => {
            log::warn!("rejected config: {}", e);
            let msg = CString::new(format!("invalid config: {}", e))
                .unwrap_or_else(|_| CString::from(c"invalid config"));
            LAST_ERROR.with(|le| *le.borrow_mut() = Some(msg));
            -1
        }
    }
}

/// Install a stderr logger honouring RUST_LOG (default level warn). Idempotent.
#[no_mangle]
pub extern "C" fn simpleget_init_logging() {
    init_logging();
}

/// Last error on this thread from a failed call. Valid until the next call on this thread. Do not free.
#[no_mangle]
pub extern "C" fn simpleget_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

#[no_mangle]
pub extern "C" fn simpleget_version() -> *const c_char {
    b"0.1.0\0".as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex;

    #[test]
    fn null_host_gives_empty_record() {
        let mut d = unsafe { http_get(ptr::null(), c"/".as_ptr(), ptr::null()) };
        assert_eq!(d.http_code, 0);
        assert!(d.data.is_null());
        assert!(!simpleget_last_error().is_null());
        unsafe { http_data_free(&mut d) };
    }

    #[test]
    fn null_user_agent_gives_empty_record() {
        let d = unsafe {
            https_get_with_useragent(c"example.com".as_ptr(), c"/".as_ptr(), ptr::null(), ptr::null())
        };
        assert_eq!(d.http_code, 0);
        assert!(d.data.is_null());
    }

    #[test]
    fn body_is_copied_and_terminated() {
        let result = FetchResult {
            status_code: 301,
            total_bytes_received: 40,
            body_bytes_received: 0,
            declared_content_length: 0,
            outcome: simpleget_core::FetchOutcome::ErrorStatus {
                location: Some("http://example.com/".to_string()),
            },
        };
        let mut d = to_http_data(&result);
        assert_eq!(d.http_code, 301);
        assert_eq!(d.data_length, 19);
        let s = unsafe { CStr::from_ptr(d.data) };
        assert_eq!(s.to_str().unwrap(), "http://example.com/");
        unsafe { http_data_free(&mut d) };
        assert!(d.data.is_null());
        // second free is a no-op
        unsafe { http_data_free(&mut d) };
    }

    #[test]
    fn bad_config_is_rejected() {
        let before = default_config();
        assert_eq!(unsafe { simpleget_configure(c"{\"http_port\":\"x\"}".as_ptr()) }, -1);
        assert_eq!(default_config(), before);
        assert_eq!(unsafe { simpleget_configure(ptr::null()) }, -1);
    }

    static RESULTS: Mutex<Option<mpsc::Sender<(c_int, c_int)>>> = Mutex::new(None);

    extern "C" fn record(id: c_int, mut data: HttpData) {
        if let Some(tx) = RESULTS.lock().unwrap().as_ref() {
            tx.send((id, data.http_code)).unwrap();
        }
        unsafe { http_data_free(&mut data) };
    }

    #[test]
    fn threaded_get_calls_back_with_worker_id() {
        let (tx, rx) = mpsc::channel();
        *RESULTS.lock().unwrap() = Some(tx);
        let id = unsafe {
            http_get_with_thread(0, c"".as_ptr(), c"/".as_ptr(), ptr::null(), ptr::null(), 0, record)
        };
        assert!(id > 0);
        let (called_with, code) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(called_with, id);
        assert_eq!(code, 0);
        assert_eq!(
            unsafe { http_get_with_thread(9, ptr::null(), ptr::null(), ptr::null(), ptr::null(), 0, record) },
            -1
        );
    }
}
