//! TLS support for HTTPS connections
//!
//! Peer verification is always on: the certificate chain is checked against
//! the system trust roots (plus any extra CA files configured) and the
//! certificate must match the requested host name.
//!
//! # Examples
//!
//! ```no_run
//! use progressed_http::http::tls::{TlsConfig, TlsVersion};
//! use std::net::TcpStream;
//!
//! let tls_config = TlsConfig::client()
//!     .min_version(TlsVersion::Tls12)
//!     .build()
//!     .unwrap();
//!
//! let tcp_stream = TcpStream::connect("example.com:443").unwrap();
//! let tls_stream = tls_config.connect("example.com", tcp_stream).unwrap();
//! ```

pub mod config;

pub use config::{ClientConfigBuilder, TlsConfig, TlsError, TlsVersion};
