//! Request target parsing
//!
//! Accepts the loose `[scheme://]host[:port][/path]` form. An explicit port is
//! always taken as given, even when it is unusual for the scheme.

use super::{Error, Result, DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT};
use std::fmt;

/// URL scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Parse a scheme name (case-insensitive, without `://`)
    pub fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("http") {
            Ok(Scheme::Http)
        } else if s.eq_ignore_ascii_case("https") {
            Ok(Scheme::Https)
        } else {
            Err(Error::UnknownScheme(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Port used when the URL does not name one
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => DEFAULT_HTTP_PORT,
            Scheme::Https => DEFAULT_HTTPS_PORT,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Target {
    /// `host:port` as handed to the resolver
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}

/// Split a URL into scheme, host, port and path
///
/// ```
/// use progressed_http::http::url::{parse_target, Scheme};
///
/// let target = parse_target("hell.net:443").unwrap();
/// assert_eq!(target.scheme, Scheme::Http);
/// assert_eq!(target.port, 443);
/// assert_eq!(target.path, "/");
/// ```
pub fn parse_target(url: &str) -> Result<Target> {
    let (scheme, rest) = match url.find("//") {
        Some(pos) => {
            let name = url[..pos].strip_suffix(':').unwrap_or(&url[..pos]);
            // "http//host" has no colon and is not a scheme we know
            if name.len() == pos {
                return Err(Error::UnknownScheme(url[..pos].to_string()));
            }
            (Scheme::from_str(name)?, &url[pos + 2..])
        }
        None => (Scheme::Http, url),
    };

    let (authority, path) = match rest.find('/') {
        Some(pos) => (&rest[..pos], &rest[pos..]),
        None => (rest, "/"),
    };

    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => {
            if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::InvalidPort(port.to_string()));
            }
            let port = port
                .parse::<u16>()
                .map_err(|_| Error::InvalidPort(port.to_string()))?;
            (host, port)
        }
        None => (authority, scheme.default_port()),
    };

    Ok(Target {
        scheme,
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}
