//! HTTP message types
//!
//! Request building for the two supported methods and the response status
//! line.

use super::{Error, Headers, Result, CRLF, USER_AGENT};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;

/// Characters escaped in form values: everything but unreserved characters
/// and `/`.
const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Parse method from string (case-insensitive)
    pub fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("GET") {
            Ok(Method::Get)
        } else if s.eq_ignore_ascii_case("POST") {
            Ok(Method::Post)
        } else {
            Err(Error::UnsupportedMethod(s.to_string()))
        }
    }

    /// Convert method to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload attached to a request
///
/// For `GET` only key/value pairs are meaningful; they become the query
/// string. For `POST` raw bytes are sent as-is and pairs are form-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestData {
    Form(Vec<(String, String)>),
    Raw(Vec<u8>),
}

impl RequestData {
    /// Build form data from anything that yields key/value pairs
    pub fn form<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        RequestData::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RequestData::Form(pairs) => pairs.is_empty(),
            RequestData::Raw(bytes) => bytes.is_empty(),
        }
    }
}

impl From<&str> for RequestData {
    fn from(s: &str) -> Self {
        RequestData::Raw(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for RequestData {
    fn from(bytes: Vec<u8>) -> Self {
        RequestData::Raw(bytes)
    }
}

/// `k=v&k=v` with values percent-encoded and keys left untouched
pub fn encode_form(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, utf8_percent_encode(v, FORM_VALUE)))
        .collect::<Vec<_>>()
        .join("&")
}

/// A request ready to be written to the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParts {
    /// `METHOD path HTTP/1.1`
    pub request_line: String,
    pub headers: Headers,
    pub entity: Vec<u8>,
}

impl RequestParts {
    /// Serialize the request
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.request_line.as_bytes());
        buf.extend_from_slice(CRLF.as_bytes());
        buf.extend_from_slice(&self.headers.to_wire());
        buf.extend_from_slice(CRLF.as_bytes());
        buf.extend_from_slice(CRLF.as_bytes());
        buf.extend_from_slice(&self.entity);
        buf
    }
}

/// Build the request line, header block and entity for one request
///
/// `Host`, `User-Agent` and `Connection: close` are always present; a
/// caller-supplied `User-Agent` is kept.
pub fn build_request(
    host: &str,
    path: &str,
    method: &str,
    headers: Option<&Headers>,
    data: Option<&RequestData>,
) -> Result<RequestParts> {
    let method = Method::from_str(method)?;
    let mut path = path.to_string();
    let mut entity = Vec::new();

    let mut headers = headers.cloned().unwrap_or_default();
    headers.validate()?;

    match (method, data) {
        (Method::Get, Some(RequestData::Form(pairs))) if !pairs.is_empty() => {
            path.push(if path.contains('?') { '&' } else { '?' });
            path.push_str(&encode_form(pairs));
        }
        (Method::Get, Some(RequestData::Raw(bytes))) if !bytes.is_empty() => {
            return Err(Error::MalformedData(
                "`GET` data should be key/value pairs".to_string(),
            ));
        }
        (Method::Post, Some(RequestData::Form(pairs))) if !pairs.is_empty() => {
            entity = encode_form(pairs).into_bytes();
            if !headers.contains("Content-Type") {
                headers.insert("Content-Type", "application/x-www-form-urlencoded");
            }
        }
        (Method::Post, Some(RequestData::Raw(bytes))) => {
            entity = bytes.clone();
        }
        _ => {}
    }

    let user_agent = headers
        .get("User-Agent")
        .map(<[u8]>::to_vec)
        .unwrap_or_else(|| USER_AGENT.as_bytes().to_vec());
    headers.set("Host", host);
    headers.set("User-Agent", user_agent);
    headers.set("Connection", "close");

    if method == Method::Post && !entity.is_empty() {
        headers.set("Content-Length", entity.len().to_string());
    }

    Ok(RequestParts {
        request_line: format!("{} {} HTTP/1.1", method, path),
        headers,
        entity,
    })
}

/// Parsed response status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Protocol version as sent, e.g. `HTTP/1.1`
    pub version: String,
    pub code: u16,
    /// Reason phrase, possibly empty
    pub reason: Vec<u8>,
}

impl StatusLine {
    /// Parse `VERSION CODE [REASON]`
    pub fn parse(line: &[u8]) -> Result<Self> {
        let mut parts = line.splitn(3, |&b| b == b' ');
        let version = parts.next().unwrap_or_default();
        let code = parts.next().ok_or_else(|| {
            Error::Protocol(format!(
                "invalid status line: {}",
                String::from_utf8_lossy(line)
            ))
        })?;
        let reason = parts.next().unwrap_or_default();

        if !version.starts_with(b"HTTP/") {
            return Err(Error::Protocol(format!(
                "invalid HTTP version: {}",
                String::from_utf8_lossy(version)
            )));
        }

        let code = std::str::from_utf8(code)
            .ok()
            .and_then(|c| c.parse::<u16>().ok())
            .ok_or_else(|| {
                Error::Protocol(format!(
                    "invalid status code: {}",
                    String::from_utf8_lossy(code)
                ))
            })?;

        Ok(StatusLine {
            version: String::from_utf8_lossy(version).into_owned(),
            code,
            reason: reason.to_vec(),
        })
    }

    pub fn is_ok(&self) -> bool {
        self.code == 200
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.version,
            self.code,
            String::from_utf8_lossy(&self.reason)
        )
    }
}
