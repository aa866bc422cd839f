/*
 * mod.rs
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

//! HTTP/1.1 GET client.
//!
//! - `request`: request line and headers, always `Connection: close`.
//! - `client`: `Connect` seam and the TCP/TLS connector.
//! - `connection`: `HttpStream`, send, and the receive loop over a growable `BytesMut`.
//! - `h1`: response framing over the accumulated bytes.
//! - `fetch`: orchestration into a `FetchResult`.
//! - `task`: thread-per-request fetches with a callback.

pub mod client;
pub mod connection;
pub mod fetch;
pub mod h1;
pub mod request;
pub mod response;
pub mod task;

pub use client::{Connect, ConnectFuture, Scheme, TcpConnector};
pub use connection::{Deadline, HttpConnection, HttpStream, ReceiveEnd, ReceiveMode, Received};
pub use fetch::Fetcher;
pub use request::{fold_user_agent, user_agent_header, RequestBuilder};
pub use response::{FetchOutcome, FetchResult};
pub use task::{spawn_fetch, FetchMode, FetchRequest, FetchTask, WorkerId};
