//! progressed-http - HTTP/1.1 downloads with a progress bar
//!
//! This crate sends a single GET or POST over a plain or TLS socket and
//! reads the response incrementally, either into memory or into a file,
//! while reporting transfer progress.
//!
//! - [`http`] holds the client: URL parsing, request building, the
//!   connection and the response reader state machine.
//! - [`progress`] holds progress snapshots, the observer trait and the
//!   terminal progress bar.

pub mod http;
pub mod progress;
