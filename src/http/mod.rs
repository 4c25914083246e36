//! HTTP/1.1 client on raw sockets
//!
//! This module provides a minimal HTTP/1.1 client that talks directly to
//! plain TCP or TLS streams. It is split into two halves:
//!
//! - [`Connector`] parses the URL, opens the connection and sends exactly one
//!   request.
//! - [`ResponseReader`] takes over the connection and drives an incremental
//!   response parser one socket read at a time, routing the body into memory
//!   or a file.
//!
//! # Architecture
//!
//! All socket I/O goes through the `SessionOps` trait so the reader is
//! indifferent to whether it is talking to a plain socket, a TLS stream or an
//! in-memory script in tests. The reader exposes a single [`ResponseReader::pump`]
//! step and a [`ResponseReader::run`] driver that feeds a
//! [`ProgressObserver`](crate::progress::ProgressObserver) after every step.
//!
//! # Examples
//!
//! ```no_run
//! use progressed_http::http::{self, RequestOptions};
//!
//! let reader = http::get("http://example.com/", RequestOptions::new().quiet()).unwrap();
//! assert_eq!(reader.status().unwrap().code, 200);
//! println!("{} bytes", reader.body().unwrap().len());
//! ```

pub mod chunked;
pub mod client;
pub mod connector;
pub mod headers;
pub mod message;
pub mod reader;
pub mod session;
pub mod sink;
pub mod tls;
pub mod url;

pub use client::{get, post, request, RequestOptions};
pub use connector::Connector;
pub use headers::Headers;
pub use message::{Method, RequestData, RequestParts, StatusLine};
pub use reader::{Completion, Failure, ReadOptions, ReadState, ResponseReader};
pub use session::{Session, SessionOps};
pub use url::{Scheme, Target};

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown scheme type `{0}`")]
    UnknownScheme(String),

    #[error("Invalid connection port `{0}`")]
    InvalidPort(String),

    #[error("Method not implemented `{0}`")]
    UnsupportedMethod(String),

    #[error("Malformed headers: {0}")]
    MalformedHeaders(String),

    #[error("Malformed request data: {0}")]
    MalformedData(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Terminal size unavailable")]
    TerminalSizeUnavailable,

    #[error("Server answered with status {0}")]
    NonOkStatus(u16),

    #[error("Response truncated after {0} bytes")]
    TruncatedResponse(u64),

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Default port for `http` targets
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Default port for `https` targets
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Bytes pulled from the socket per pump step unless configured otherwise
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Agent string sent when the caller does not provide `User-Agent`
pub const USER_AGENT: &str = concat!("ProgressedAgent ", env!("CARGO_PKG_VERSION"));

/// CRLF line ending
pub const CRLF: &str = "\r\n";
