//! Transfer progress reporting
//!
//! The response reader never paints anything itself. After each step the
//! driver hands a [`Progress`] snapshot to a [`ProgressObserver`];
//! [`TerminalProgress`] is the observer that draws a single updating line.

use crate::http::Error;
use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

/// Width used when the terminal cannot be queried
pub const DEFAULT_WIDTH: usize = 50;

/// Minimum time between two paints
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

const SPINNER: [&str; 3] = [">> ", " >>", "> >"];

/// Snapshot of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress<'a> {
    /// Body bytes delivered so far
    pub delivered: u64,
    /// Declared length, or the fixed ceiling for chunked bodies
    pub total: u64,
    pub chunked: bool,
    pub title: &'a str,
    /// Decoded payload bytes of a chunked body
    pub received: u64,
}

impl Progress<'_> {
    /// Completed fraction in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.delivered as f64 / self.total as f64).min(1.0)
        }
    }
}

/// Receives progress after each transfer step
pub trait ProgressObserver {
    /// Called after a step that received bytes
    fn update(&mut self, progress: &Progress<'_>);

    /// Called once when the transfer reached a terminal state
    fn finish(&mut self, _progress: &Progress<'_>) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn update(&mut self, _progress: &Progress<'_>) {}
}

/// Single-line terminal progress bar
///
/// Known-length transfers show a `#` fill bar with a percentage; chunked
/// transfers show a moving `>>` pattern and the received byte count.
pub struct TerminalProgress<W: Write = Stdout> {
    out: W,
    width: Option<usize>,
    fill: char,
    interval: Duration,
    last_paint: Option<Instant>,
    cursor: usize,
}

impl TerminalProgress<Stdout> {
    /// Progress bar on standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalProgress<W> {
    /// Progress bar writing to `out`
    pub fn new(out: W) -> Self {
        TerminalProgress {
            out,
            width: None,
            fill: '#',
            interval: REFRESH_INTERVAL,
            last_paint: None,
            cursor: 0,
        }
    }

    /// Use a fixed width instead of asking the terminal
    pub fn width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Character used to fill the bar
    pub fn fill(mut self, fill: char) -> Self {
        self.fill = fill;
        self
    }

    /// Minimum time between paints
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn current_width(&self) -> usize {
        self.width
            .unwrap_or_else(|| width_or_default(terminal_width()))
    }

    /// Render one line for `progress` at `width` columns, ending in `\r`
    pub fn render(&mut self, progress: &Progress<'_>, width: usize) -> String {
        let title_width = display_width(progress.title);

        if !progress.chunked {
            let fraction = progress.fraction();
            let percent = format!("{}%", (fraction * 100.0) as u64);
            let bar_width = width.saturating_sub(percent.len() + title_width + 7);
            let marks = (bar_width as f64 * fraction).floor() as usize;
            format!(
                " {} [{}{}]  {}\r",
                progress.title,
                self.fill.to_string().repeat(marks),
                " ".repeat(bar_width - marks),
                percent
            )
        } else {
            self.cursor += 1;
            let received = human_bytes(progress.received as i64);
            let bar_width = width.saturating_sub(title_width + received.len() + 6);
            let pattern: String = SPINNER[self.cursor % SPINNER.len()]
                .chars()
                .cycle()
                .take(bar_width)
                .collect();
            format!(" {} [{}] {}\r", progress.title, pattern, received)
        }
    }
}

impl<W: Write> ProgressObserver for TerminalProgress<W> {
    fn update(&mut self, progress: &Progress<'_>) {
        let now = Instant::now();
        if let Some(last) = self.last_paint {
            if now.duration_since(last) < self.interval {
                return;
            }
        }
        self.last_paint = Some(now);

        let width = self.current_width();
        let line = self.render(progress, width);
        // A closed stdout should not abort the transfer
        let _ = self
            .out
            .write_all(line.as_bytes())
            .and_then(|_| self.out.flush());
    }

    fn finish(&mut self, _progress: &Progress<'_>) {
        let width = self.current_width();
        let _ = write!(self.out, "{}\r", " ".repeat(width)).and_then(|_| self.out.flush());
    }
}

/// Query the width of the terminal attached to standard output
pub fn terminal_width() -> Result<usize, Error> {
    query_width(libc::STDOUT_FILENO)
}

/// Queried width, or [`DEFAULT_WIDTH`] when there is no terminal
pub fn width_or_default(queried: Result<usize, Error>) -> usize {
    queried.unwrap_or(DEFAULT_WIDTH)
}

fn query_width(fd: libc::c_int) -> Result<usize, Error> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    // SAFETY: TIOCGWINSZ only writes into the winsize we pass
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };

    if result != 0 || size.ws_col == 0 {
        return Err(Error::TerminalSizeUnavailable);
    }
    Ok(size.ws_col as usize)
}

/// Human readable byte count using 1024 steps
///
/// ```
/// use progressed_http::progress::human_bytes;
///
/// assert_eq!(human_bytes(0), "0.00 B");
/// assert_eq!(human_bytes(1025), "1.00 KB");
/// assert_eq!(human_bytes(-10), "-10");
/// ```
pub fn human_bytes(bytes: i64) -> String {
    if bytes < 0 {
        return bytes.to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value > 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Columns a string takes in a monospace terminal
///
/// Anything outside ASCII is counted as a wide character.
pub fn display_width(s: &str) -> usize {
    s.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}
