//! TLS client configuration

use openssl::ssl::{SslConnector, SslMethod, SslStream, SslVersion};
use std::net::TcpStream;
use std::path::PathBuf;

/// Lowest protocol version the client will negotiate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    /// TLS 1.2
    Tls12,
    /// TLS 1.3
    Tls13,
}

impl TlsVersion {
    /// Get OpenSSL protocol version constant
    pub fn to_openssl_version(&self) -> SslVersion {
        match self {
            TlsVersion::Tls12 => SslVersion::TLS1_2,
            TlsVersion::Tls13 => SslVersion::TLS1_3,
        }
    }

    /// Get version as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls12 => "TLSv1.2",
            TlsVersion::Tls13 => "TLSv1.3",
        }
    }
}

/// TLS errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),
}

/// TLS client configuration (immutable after building)
#[derive(Clone)]
pub struct TlsConfig {
    connector: SslConnector,
}

impl TlsConfig {
    /// Create a new client configuration builder
    pub fn client() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Client configuration with the system trust roots only
    pub fn with_system_roots() -> Result<Self, TlsError> {
        Self::client().build()
    }

    /// Perform the client handshake over an established TCP stream
    ///
    /// `host` is used for SNI and checked against the server certificate.
    pub fn connect(&self, host: &str, stream: TcpStream) -> Result<SslStream<TcpStream>, TlsError> {
        self.connector
            .connect(host, stream)
            .map_err(|e| TlsError::HandshakeFailed(e.to_string()))
    }
}

/// Client configuration builder
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    ca_files: Vec<PathBuf>,
    min_version: Option<TlsVersion>,
}

impl ClientConfigBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Trust an additional CA bundle (PEM) on top of the system roots
    pub fn ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_files.push(path.into());
        self
    }

    /// Refuse protocol versions older than `version`
    pub fn min_version(mut self, version: TlsVersion) -> Self {
        self.min_version = Some(version);
        self
    }

    /// Build the configuration
    ///
    /// The connector starts from OpenSSL's defaults: peer verification on
    /// and the default verify paths loaded.
    pub fn build(self) -> Result<TlsConfig, TlsError> {
        let mut builder = SslConnector::builder(SslMethod::tls_client())?;

        for path in &self.ca_files {
            builder.set_ca_file(path).map_err(|e| {
                TlsError::Certificate(format!("Failed to load {}: {}", path.display(), e))
            })?;
        }

        if let Some(version) = self.min_version {
            builder.set_min_proto_version(Some(version.to_openssl_version()))?;
        }

        Ok(TlsConfig {
            connector: builder.build(),
        })
    }
}
