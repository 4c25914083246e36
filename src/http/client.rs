//! One-call request API
//!
//! [`request`] wires a [`Connector`] to a [`ResponseReader`] and drives the
//! transfer to its end. The finished reader is returned either way; call
//! [`ResponseReader::error_for_outcome`] to turn a truncated or rejected
//! transfer into an error.

use super::reader::{ReadOptions, ResponseReader};
use super::tls::TlsConfig;
use super::{Connector, Headers, RequestData, Result};
use crate::progress::NoProgress;
use std::path::PathBuf;

/// Per-request settings
///
/// ```
/// use progressed_http::http::RequestOptions;
///
/// let options = RequestOptions::new()
///     .header("Accept", "text/html")
///     .form([("q", "rust")])
///     .chunk_size(8192)
///     .quiet();
/// assert_eq!(options.read_options().chunk_size, 8192);
/// ```
#[derive(Clone, Default)]
pub struct RequestOptions {
    headers: Option<Headers>,
    data: Option<RequestData>,
    read: ReadOptions,
    tls: Option<TlsConfig>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request header
    pub fn header(mut self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.headers.get_or_insert_with(Headers::new).insert(name, value);
        self
    }

    /// Replace all request headers
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Request data: a query string for GET, the entity for POST
    pub fn data(mut self, data: impl Into<RequestData>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Form pairs, url-encoded into the query (GET) or the entity (POST)
    pub fn form<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.data(RequestData::form(pairs))
    }

    /// Write the body to `path` instead of memory
    pub fn destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.read.destination = Some(path.into());
        self
    }

    /// Replace an existing destination file
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.read.overwrite = overwrite;
        self
    }

    /// Maximum bytes per socket read
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.read.chunk_size = size;
        self
    }

    /// Stop after the response headers
    pub fn skip_body(mut self, skip: bool) -> Self {
        self.read.skip_body = skip;
        self
    }

    /// Turn the progress bar on or off
    pub fn progress(mut self, enabled: bool) -> Self {
        self.read.progress = enabled;
        self
    }

    /// Disable the progress bar
    pub fn quiet(self) -> Self {
        self.progress(false)
    }

    /// TLS settings for `https` URLs
    pub fn tls(mut self, config: TlsConfig) -> Self {
        self.tls = Some(config);
        self
    }

    pub fn read_options(&self) -> &ReadOptions {
        &self.read
    }
}

/// Send one request and read the response to the end
///
/// Errors are returned for anything that goes wrong before the response is
/// being read: a bad URL, method or headers, a failed connection or a
/// destination file that cannot be created. How the transfer itself ended
/// is recorded in the returned reader's state.
pub fn request(url: &str, method: &str, options: RequestOptions) -> Result<ResponseReader<Connector>> {
    let RequestOptions {
        headers,
        data,
        read,
        tls,
    } = options;

    let mut connector = match tls {
        Some(config) => Connector::with_tls(config),
        None => Connector::new(),
    };
    connector.send(url, method, headers.as_ref(), data.as_ref())?;

    let progress = read.progress;
    let mut reader = ResponseReader::new(connector, read)?;
    if progress {
        reader.run();
    } else {
        reader.run_with(&mut NoProgress);
    }

    Ok(reader)
}

/// `GET` shorthand for [`request`]
pub fn get(url: &str, options: RequestOptions) -> Result<ResponseReader<Connector>> {
    request(url, "GET", options)
}

/// `POST` shorthand for [`request`]
pub fn post(url: &str, options: RequestOptions) -> Result<ResponseReader<Connector>> {
    request(url, "POST", options)
}
