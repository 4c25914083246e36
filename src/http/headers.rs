//! HTTP headers handling
//!
//! Names and values are kept as raw bytes since servers are free to send
//! non-UTF-8 values. Lookups are case-insensitive; names parsed off the wire
//! are normalized to title case (`content-length` becomes `Content-Length`).

use super::{Error, Result};
use std::fmt;

/// HTTP headers collection
///
/// Headers are stored in insertion order. [`Headers::set`] replaces an
/// existing header of the same name, [`Headers::insert`] appends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Headers {
    /// Create a new empty headers collection
    pub fn new() -> Self {
        Headers {
            headers: Vec::new(),
        }
    }

    /// Append a header, keeping any existing value of the same name
    pub fn insert(&mut self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) {
        self.headers
            .push((name.as_ref().to_vec(), value.as_ref().to_vec()));
    }

    /// Set a header, replacing the first value of the same name in place
    ///
    /// Later duplicates are dropped so the header appears exactly once.
    pub fn set(&mut self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) {
        let name = name.as_ref();
        match self.position(name) {
            Some(pos) => {
                self.headers[pos].1 = value.as_ref().to_vec();
                let mut idx = 0;
                self.headers.retain(|(n, _)| {
                    let keep = idx <= pos || !n.eq_ignore_ascii_case(name);
                    idx += 1;
                    keep
                });
            }
            None => self.insert(name, value),
        }
    }

    /// Get the first value for a header (case-insensitive)
    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&[u8]> {
        self.position(name.as_ref())
            .map(|pos| self.headers[pos].1.as_slice())
    }

    /// Get the first value as text, if it is valid UTF-8
    pub fn get_str(&self, name: impl AsRef<[u8]>) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Check if a header exists
    pub fn contains(&self, name: impl AsRef<[u8]>) -> bool {
        self.position(name.as_ref()).is_some()
    }

    /// Remove all instances of a header (case-insensitive)
    pub fn remove(&mut self, name: impl AsRef<[u8]>) -> usize {
        let name = name.as_ref();
        let initial_len = self.headers.len();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        initial_len - self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate over all headers
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.headers
            .iter()
            .map(|(n, v)| (n.as_slice(), v.as_slice()))
    }

    /// Serialize as `Name: value` lines joined by CRLF, without a trailing CRLF
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for (i, (name, value)) in self.headers.iter().enumerate() {
            if i > 0 {
                buf.extend_from_slice(b"\r\n");
            }
            buf.extend_from_slice(name);
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value);
        }
        buf
    }

    /// Check that every header can be written onto the wire
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.headers {
            if name.is_empty() {
                return Err(Error::MalformedHeaders("empty header name".to_string()));
            }
            if !name.iter().all(|&b| is_token_byte(b)) {
                return Err(Error::MalformedHeaders(format!(
                    "invalid header name `{}`",
                    String::from_utf8_lossy(name)
                )));
            }
            if value.iter().any(|&b| b == b'\r' || b == b'\n') {
                return Err(Error::MalformedHeaders(format!(
                    "line break in value of `{}`",
                    String::from_utf8_lossy(name)
                )));
            }
        }
        Ok(())
    }

    /// Parse a response header line into a title-cased name and trimmed value
    pub fn parse_header_line(line: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        let colon_pos = line.iter().position(|&b| b == b':').ok_or_else(|| {
            Error::Protocol(format!(
                "no colon in header: {}",
                String::from_utf8_lossy(line)
            ))
        })?;

        let name = line[..colon_pos].trim_ascii();
        if name.is_empty() {
            return Err(Error::Protocol("empty header name".to_string()));
        }

        Ok((title_case(name), line[colon_pos + 1..].trim_ascii().to_vec()))
    }

    fn position(&self, name: &[u8]) -> Option<usize> {
        self.headers
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            writeln!(
                f,
                "{}: {}",
                String::from_utf8_lossy(name),
                String::from_utf8_lossy(value)
            )?;
        }
        Ok(())
    }
}

impl<N: AsRef<[u8]>, V: AsRef<[u8]>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Title-case a header name
///
/// The first letter of every run of letters is uppercased and the rest
/// lowercased; anything that is not an ASCII letter starts a new run.
pub fn title_case(name: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len());
    let mut in_word = false;
    for &b in name {
        if b.is_ascii_alphabetic() {
            out.push(if in_word {
                b.to_ascii_lowercase()
            } else {
                b.to_ascii_uppercase()
            });
            in_word = true;
        } else {
            out.push(b);
            in_word = false;
        }
    }
    out
}

// RFC 9110 tchar
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
