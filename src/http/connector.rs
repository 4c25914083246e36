//! Connection setup and request sending
//!
//! A [`Connector`] handles one request: it parses the URL, opens a fresh
//! plain or TLS connection and writes the serialized request. The open
//! connection is then handed to a [`ResponseReader`](super::ResponseReader),
//! which reads through the connector and closes it when the transfer ends.

use super::message::{build_request, RequestData, RequestParts};
use super::session::{Session, SessionOps};
use super::tls::TlsConfig;
use super::url::{parse_target, Scheme, Target};
use super::{Error, Headers, Result};
use log::{debug, warn};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

/// Opens the connection and sends one request
#[derive(Default)]
pub struct Connector {
    target: Option<Target>,
    session: Option<Session>,
    tls: Option<TlsConfig>,
}

impl Connector {
    /// Connector that verifies HTTPS peers against the system trust roots
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector with a custom TLS configuration for `https` targets
    pub fn with_tls(config: TlsConfig) -> Self {
        Connector {
            target: None,
            session: None,
            tls: Some(config),
        }
    }

    /// Target of the last request, once parsed
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// The live session, if connected
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Open a connection to `target`
    ///
    /// Any previous connection is closed first.
    pub fn connect(&mut self, target: &Target) -> Result<()> {
        self.close()?;

        let tcp = open_tcp(target)?;
        let session = match target.scheme {
            Scheme::Http => Session::Plain(tcp),
            Scheme::Https => {
                let config = match &self.tls {
                    Some(config) => config.clone(),
                    None => TlsConfig::with_system_roots()
                        .map_err(|e| Error::Connection(e.to_string()))?,
                };
                let stream = config
                    .connect(&target.host, tcp)
                    .map_err(|e| Error::Connection(format!("{}: {}", target.authority(), e)))?;
                Session::Tls(stream)
            }
        };

        debug!("connected to {}", target);
        self.session = Some(session);
        Ok(())
    }

    /// Parse the URL, build the request, connect and send it
    ///
    /// URL, method and header problems are reported before anything touches
    /// the network.
    pub fn send(
        &mut self,
        url: &str,
        method: &str,
        headers: Option<&Headers>,
        data: Option<&RequestData>,
    ) -> Result<&mut Session> {
        let target = parse_target(url)?;
        let parts = build_request(&target.host, &target.path, method, headers, data)?;

        self.connect(&target)?;
        self.target = Some(target);
        self.send_parts(&parts)?;

        self.session.as_mut().ok_or(Error::NotConnected)
    }

    /// Write an already built request to the open connection
    pub fn send_parts(&mut self, parts: &RequestParts) -> Result<()> {
        let session = self.session.as_mut().ok_or(Error::NotConnected)?;
        let wire = parts.to_wire();
        debug!("request: {:?}", String::from_utf8_lossy(&wire));
        session.write_all(&wire)
    }

    /// Close the connection; further calls do nothing
    pub fn close(&mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => {
                debug!("closing connection");
                session.close()
            }
            None => Ok(()),
        }
    }
}

impl SessionOps for Connector {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.session.as_mut().ok_or(Error::NotConnected)?.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.session.as_mut().ok_or(Error::NotConnected)?.write(buf)
    }

    fn close(&mut self) -> Result<()> {
        Connector::close(self)
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close connection: {}", e);
        }
    }
}

/// Resolve the target and connect to the first address that accepts
fn open_tcp(target: &Target) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|e| Error::Connection(format!("{}: {}", target.authority(), e)))?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        match connect_addr(addr) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("connect to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(Error::Connection(match last_err {
        Some(e) => format!("{}: {}", target.authority(), e),
        None => format!("{}: no addresses found", target.authority()),
    }))
}

fn connect_addr(addr: SocketAddr) -> std::io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_nodelay(true)?;
    socket.connect(&addr.into())?;
    Ok(socket.into())
}
