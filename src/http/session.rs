//! Session operations abstraction
//!
//! This module provides the session operations pattern that allows
//! transparent switching between plain TCP and TLS connections. The
//! response reader only ever sees a `SessionOps`, which is also what lets
//! tests feed it scripted byte sequences.

use super::{Error, Result};
use openssl::ssl::SslStream;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};

/// Session operations trait
///
/// This trait defines the operations that can be performed on a session,
/// abstracting over plain TCP and TLS connections.
pub trait SessionOps {
    /// Read up to `buf.len()` bytes; `Ok(0)` means the peer closed
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write some bytes, returning how many were accepted
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Close the session
    ///
    /// Implementations must tolerate being called more than once.
    fn close(&mut self) -> Result<()>;

    /// Write the whole buffer
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..])?;
            if n == 0 {
                return Err(Error::Io(std::io::ErrorKind::WriteZero.into()));
            }
            written += n;
        }
        Ok(())
    }
}

impl<S: SessionOps + ?Sized> SessionOps for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// A connected stream, plain or TLS-wrapped
pub enum Session {
    Plain(TcpStream),
    Tls(SslStream<TcpStream>),
}

impl Session {
    /// Whether the stream is TLS-wrapped
    pub fn is_tls(&self) -> bool {
        matches!(self, Session::Tls(_))
    }

    /// The underlying TCP socket
    pub fn tcp(&self) -> &TcpStream {
        match self {
            Session::Plain(stream) => stream,
            Session::Tls(stream) => stream.get_ref(),
        }
    }
}

impl SessionOps for Session {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Session::Plain(stream) => stream.read(buf),
            Session::Tls(stream) => stream.read(buf),
        }
        .map_err(Error::from)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match self {
            Session::Plain(stream) => stream.write(buf),
            Session::Tls(stream) => stream.write(buf),
        }
        .map_err(Error::from)
    }

    fn close(&mut self) -> Result<()> {
        if let Session::Tls(stream) = self {
            // close_notify; the peer may already be gone
            let _ = stream.shutdown();
        }

        match self.tcp().shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Already shut down, or reset by the peer
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(Error::from(e)),
        }
    }
}
