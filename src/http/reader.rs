//! Incremental response reading
//!
//! [`ResponseReader`] owns the connection after the request went out and
//! advances one socket read at a time:
//!
//! ```text
//! AwaitingHeaders -> Transferring -> Done(..)
//!        \                 \
//!         `-----------------`---> Failed(..)
//! ```
//!
//! Bytes that arrive together with the header block are body bytes and are
//! handled in the same step. Entering `Done` or `Failed` closes the
//! connection and the output file exactly once.

use super::chunked::{ChunkDecoder, DecodeStep};
use super::connector::Connector;
use super::headers::Headers;
use super::message::StatusLine;
use super::session::SessionOps;
use super::sink::Sink;
use super::{Error, Result, DEFAULT_CHUNK_SIZE};
use crate::progress::{Progress, ProgressObserver, TerminalProgress};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Progress ceiling reported for chunked bodies, whose size is unknown
pub const CHUNKED_TOTAL: u64 = 100;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Largest header block accepted before the response is rejected
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// How the reader consumes a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Maximum bytes per socket read
    pub chunk_size: usize,
    /// Stop right after the header block
    pub skip_body: bool,
    /// Write the body here instead of keeping it in memory
    pub destination: Option<PathBuf>,
    /// Replace an existing destination instead of picking `N_name`
    pub overwrite: bool,
    /// Report progress to the observer
    pub progress: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            skip_body: false,
            destination: None,
            overwrite: false,
            progress: true,
        }
    }
}

/// How a finished transfer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The whole body was received
    Complete,
    /// Only headers were requested
    HeadersOnly,
    /// The peer closed or the read failed before the body was complete
    Truncated,
}

/// Why a transfer was abandoned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Status other than 200 while writing to a file; the file was removed
    NonOkStatus(u16),
    /// The response could not be parsed
    Protocol(String),
    /// Writing the body failed
    Sink(String),
}

/// Reader state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadState {
    AwaitingHeaders,
    Transferring,
    Done(Completion),
    Failed(Failure),
}

impl ReadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReadState::Done(_) | ReadState::Failed(_))
    }
}

/// Body framing, known once headers are parsed
#[derive(Debug)]
enum Framing {
    Length,
    Chunked(ChunkDecoder),
}

/// Reads one response off a connection
pub struct ResponseReader<S: SessionOps = Connector> {
    session: S,
    state: ReadState,
    chunk_size: usize,
    skip_body: bool,
    progress_enabled: bool,
    head: Vec<u8>,
    status: Option<StatusLine>,
    headers: Headers,
    framing: Option<Framing>,
    delivered: u64,
    expected: u64,
    last_read: usize,
    read_buf: Vec<u8>,
    sink: Sink,
    title: String,
    released: bool,
}

impl<S: SessionOps> ResponseReader<S> {
    /// Take over `session` and prepare the output sink
    ///
    /// If the destination file cannot be created the session is closed
    /// before the error is returned.
    pub fn new(mut session: S, options: ReadOptions) -> Result<Self> {
        let sink = match &options.destination {
            Some(path) => match Sink::file(path, options.overwrite) {
                Ok(sink) => sink,
                Err(e) => {
                    let _ = session.close();
                    return Err(Error::Io(e));
                }
            },
            None => Sink::memory(),
        };
        let chunk_size = options.chunk_size.max(1);

        Ok(ResponseReader {
            session,
            state: ReadState::AwaitingHeaders,
            chunk_size,
            skip_body: options.skip_body,
            progress_enabled: options.progress,
            head: Vec::new(),
            status: None,
            headers: Headers::new(),
            framing: None,
            delivered: 0,
            expected: 0,
            last_read: 0,
            read_buf: vec![0u8; chunk_size],
            title: sink.title(),
            sink,
            released: false,
        })
    }

    /// Perform one socket read and advance the state machine
    ///
    /// Does nothing once a terminal state was reached.
    pub fn pump(&mut self) -> &ReadState {
        self.last_read = 0;
        if self.state.is_terminal() {
            return &self.state;
        }

        let mut buf = std::mem::take(&mut self.read_buf);
        match self.session.read(&mut buf[..self.chunk_size]) {
            Ok(0) => {
                debug!("peer closed after {} body bytes", self.delivered);
                self.finish(ReadState::Done(Completion::Truncated));
            }
            Ok(n) => {
                self.last_read = n;
                self.consume(&buf[..n]);
            }
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!("read failed after {} body bytes: {}", self.delivered, e);
                self.finish(ReadState::Done(Completion::Truncated));
            }
        }
        self.read_buf = buf;

        &self.state
    }

    /// Pump until a terminal state, reporting to `observer`
    pub fn run_with<O: ProgressObserver + ?Sized>(&mut self, observer: &mut O) -> &ReadState {
        while !self.state.is_terminal() {
            self.pump();
            if self.progress_enabled && self.last_read > 0 {
                observer.update(&self.progress());
            }
        }
        if self.progress_enabled {
            observer.finish(&self.progress());
        }
        &self.state
    }

    /// Pump until a terminal state with a progress bar on stdout
    pub fn run(&mut self) -> &ReadState {
        let mut bar = TerminalProgress::stdout();
        self.run_with(&mut bar)
    }

    fn consume(&mut self, data: &[u8]) {
        match self.state {
            ReadState::AwaitingHeaders => self.consume_head(data),
            ReadState::Transferring => self.consume_body(data),
            ReadState::Done(_) | ReadState::Failed(_) => {}
        }
    }

    fn consume_head(&mut self, data: &[u8]) {
        // The terminator may straddle the previous read
        let search_from = self.head.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
        self.head.extend_from_slice(data);

        let end = match self.head[search_from..]
            .windows(HEADER_TERMINATOR.len())
            .position(|w| w == HEADER_TERMINATOR)
        {
            Some(pos) => search_from + pos,
            None if self.head.len() > MAX_HEAD_SIZE => {
                let msg = format!("no end of headers within {} bytes", MAX_HEAD_SIZE);
                return self.finish(ReadState::Failed(Failure::Protocol(msg)));
            }
            None => return,
        };

        let head = std::mem::take(&mut self.head);
        let mut lines = head[..end].split(|&b| b == b'\n').map(|line| line.strip_suffix(b"\r").unwrap_or(line));

        let status = match StatusLine::parse(lines.next().unwrap_or_default()) {
            Ok(status) => status,
            Err(e) => return self.finish(ReadState::Failed(Failure::Protocol(e.to_string()))),
        };
        for line in lines {
            match Headers::parse_header_line(line) {
                // A repeated header replaces the earlier value
                Ok((name, value)) => self.headers.set(name, value),
                Err(e) => warn!("skipping header line: {}", e),
            }
        }
        debug!("response: {}", status);

        let code = status.code;
        self.status = Some(status);

        if self.sink.path().is_some() && code != 200 {
            if let Err(e) = self.sink.discard() {
                warn!("failed to remove partial download: {}", e);
            }
            return self.finish(ReadState::Failed(Failure::NonOkStatus(code)));
        }

        if self.skip_body {
            return self.finish(ReadState::Done(Completion::HeadersOnly));
        }

        match self.headers.get("Content-Length") {
            Some(value) => {
                let length = std::str::from_utf8(value)
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok());
                match length {
                    Some(length) => {
                        self.expected = length;
                        self.framing = Some(Framing::Length);
                    }
                    None => {
                        let msg = format!(
                            "invalid Content-Length: {}",
                            String::from_utf8_lossy(value)
                        );
                        return self.finish(ReadState::Failed(Failure::Protocol(msg)));
                    }
                }
            }
            None => {
                self.expected = CHUNKED_TOTAL;
                self.framing = Some(Framing::Chunked(ChunkDecoder::new()));
            }
        }

        self.state = ReadState::Transferring;
        if matches!(self.framing, Some(Framing::Length)) && self.expected == 0 {
            return self.finish(ReadState::Done(Completion::Complete));
        }

        let body = &head[end + HEADER_TERMINATOR.len()..];
        if !body.is_empty() {
            self.consume_body(body);
        }
    }

    fn consume_body(&mut self, data: &[u8]) {
        match &mut self.framing {
            Some(Framing::Length) => {
                let remaining = self.expected.saturating_sub(self.delivered);
                let take = data.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
                if take < data.len() {
                    debug!("ignoring {} bytes past Content-Length", data.len() - take);
                }
                if let Err(e) = self.sink.write(&data[..take]) {
                    return self.finish(ReadState::Failed(Failure::Sink(e.to_string())));
                }
                self.delivered += take as u64;
                if self.delivered == self.expected {
                    self.finish(ReadState::Done(Completion::Complete));
                }
            }
            Some(Framing::Chunked(decoder)) => {
                decoder.push(data);
                loop {
                    match decoder.next_chunk() {
                        Ok(DecodeStep::Data(chunk)) => {
                            if let Err(e) = self.sink.write(&chunk) {
                                return self.finish(ReadState::Failed(Failure::Sink(e.to_string())));
                            }
                            self.delivered += chunk.len() as u64;
                        }
                        Ok(DecodeStep::Incomplete) => return,
                        Ok(DecodeStep::End) => {
                            return self.finish(ReadState::Done(Completion::Complete));
                        }
                        Err(e) => {
                            return self.finish(ReadState::Failed(Failure::Protocol(e.to_string())));
                        }
                    }
                }
            }
            None => {}
        }
    }

    /// Enter a terminal state and release the connection and file
    fn finish(&mut self, state: ReadState) {
        if self.state.is_terminal() {
            return;
        }
        debug!("transfer finished: {:?}", state);
        self.state = state;
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Err(e) = self.sink.close() {
            warn!("failed to close output file: {}", e);
        }
        if let Err(e) = self.session.close() {
            warn!("failed to close connection: {}", e);
        }
    }

    /// Current state
    pub fn state(&self) -> &ReadState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Status line, once headers were parsed
    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Whether the body uses chunked framing
    pub fn is_chunked(&self) -> bool {
        matches!(self.framing, Some(Framing::Chunked(_)))
    }

    /// Body bytes delivered to the sink so far
    pub fn bytes_delivered(&self) -> u64 {
        self.delivered
    }

    /// Declared body length, or [`CHUNKED_TOTAL`] for chunked bodies
    pub fn bytes_expected(&self) -> u64 {
        self.expected
    }

    /// Bytes returned by the most recent read
    pub fn last_read(&self) -> usize {
        self.last_read
    }

    /// Body collected in memory; `None` when writing to a file
    pub fn body(&self) -> Option<&[u8]> {
        self.sink.data()
    }

    /// File the body was written to
    pub fn file_path(&self) -> Option<&Path> {
        self.sink.path()
    }

    /// Display title: the destination file name, or empty
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Snapshot for progress observers
    pub fn progress(&self) -> Progress<'_> {
        Progress {
            delivered: self.delivered,
            total: self.expected,
            chunked: self.is_chunked(),
            title: &self.title,
            received: self.delivered,
        }
    }

    /// Turn the outcome of a finished transfer into a `Result`
    ///
    /// A transfer that has not reached a terminal state counts as truncated.
    pub fn error_for_outcome(&self) -> Result<()> {
        match &self.state {
            ReadState::Done(Completion::Complete) | ReadState::Done(Completion::HeadersOnly) => Ok(()),
            ReadState::Done(Completion::Truncated) | ReadState::AwaitingHeaders | ReadState::Transferring => {
                Err(Error::TruncatedResponse(self.delivered))
            }
            ReadState::Failed(Failure::NonOkStatus(code)) => Err(Error::NonOkStatus(*code)),
            ReadState::Failed(Failure::Protocol(msg)) => Err(Error::Protocol(msg.clone())),
            ReadState::Failed(Failure::Sink(msg)) => {
                Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, msg.clone())))
            }
        }
    }

    /// Get a reference to the underlying session
    pub fn get_ref(&self) -> &S {
        &self.session
    }

    /// Consume the reader, returning the in-memory body if there is one
    pub fn into_body(mut self) -> Option<Vec<u8>> {
        self.release();
        match std::mem::replace(&mut self.sink, Sink::memory()) {
            Sink::Memory(data) => Some(data),
            Sink::File { .. } => None,
        }
    }
}

impl<S: SessionOps> Drop for ResponseReader<S> {
    fn drop(&mut self) {
        self.release();
    }
}
