/*
 * client.rs
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

//! Transport connector: resolve a host, open TCP, optionally wrap in TLS.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::net::{server_name, tls_connector};
use crate::protocol::http::connection::HttpStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn is_secure(self) -> bool {
        self == Scheme::Https
    }

    pub fn port(self, config: &FetchConfig) -> u16 {
        match self {
            Scheme::Http => config.http_port,
            Scheme::Https => config.https_port,
        }
    }
}

pub type ConnectFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpStream, FetchError>> + Send + 'a>>;

/// Opens transports for the fetch engine. `TcpConnector` is the network implementation.
pub trait Connect: Send + Sync {
    fn connect<'a>(&'a self, host: &'a str, port: u16, scheme: Scheme) -> ConnectFuture<'a>;
}

/// Resolves with the system resolver and connects to the first address that accepts.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
    verify_certificates: bool,
}

impl TcpConnector {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            verify_certificates: config.verify_certificates,
        }
    }

    async fn connect_tcp(host: &str, port: u16) -> Result<TcpStream, FetchError> {
        let addrs: Vec<_> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|source| FetchError::Resolve {
                host: host.to_string(),
                source,
            })?
            .collect();
        if addrs.is_empty() {
            return Err(FetchError::Resolve {
                host: host.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no addresses"),
            });
        }
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(tcp) => {
                    log::debug!("connected to {} ({})", host, addr);
                    return Ok(tcp);
                }
                Err(e) => {
                    log::debug!("connect to {} ({}) failed: {}", host, addr, e);
                    last_err = Some(e);
                }
            }
        }
        Err(FetchError::Connect {
            host: host.to_string(),
            source: last_err
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no address accepted")),
        })
    }

    async fn wrap_tls(&self, host: &str, tcp: TcpStream) -> Result<HttpStream, FetchError> {
        let tls_err = |source: io::Error| FetchError::Tls {
            host: host.to_string(),
            source,
        };
        let connector = tls_connector(self.verify_certificates).map_err(tls_err)?;
        let name = server_name(host).map_err(tls_err)?;
        let tls = connector.connect(name, tcp).await.map_err(tls_err)?;
        Ok(HttpStream::Tls(Box::new(tls)))
    }

    async fn open(&self, host: &str, port: u16, scheme: Scheme) -> Result<HttpStream, FetchError> {
        let tcp = Self::connect_tcp(host, port).await?;
        match scheme {
            Scheme::Http => Ok(HttpStream::Plain(tcp)),
            Scheme::Https => self.wrap_tls(host, tcp).await,
        }
    }
}

impl Connect for TcpConnector {
    fn connect<'a>(&'a self, host: &'a str, port: u16, scheme: Scheme) -> ConnectFuture<'a> {
        Box::pin(async move {
            timeout(self.connect_timeout, self.open(host, port, scheme))
                .await
                .map_err(|_| FetchError::Connect {
                    host: host.to_string(),
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                })?
        })
    }
}
