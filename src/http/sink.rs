//! Body destinations
//!
//! Decoded body bytes go either into memory or into a file. When the file
//! already exists it is replaced (overwrite) or a free `N_name` sibling is
//! picked instead.

use log::debug;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where decoded body bytes end up
#[derive(Debug)]
pub enum Sink {
    Memory(Vec<u8>),
    File {
        path: PathBuf,
        writer: Option<BufWriter<File>>,
    },
}

impl Sink {
    /// In-memory sink
    pub fn memory() -> Self {
        Sink::Memory(Vec::new())
    }

    /// File sink at `path`, or at a numbered sibling if `path` exists and
    /// `overwrite` is off
    pub fn file(path: impl AsRef<Path>, overwrite: bool) -> io::Result<Self> {
        let path = resolve_destination(path.as_ref(), overwrite)?;
        let file = File::create(&path)?;
        debug!("writing body to {}", path.display());
        Ok(Sink::File {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Write decoded body bytes
    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Sink::Memory(buf) => {
                buf.extend_from_slice(data);
                Ok(())
            }
            Sink::File {
                writer: Some(writer),
                ..
            } => writer.write_all(data),
            Sink::File { path, writer: None } => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is already closed", path.display()),
            )),
        }
    }

    /// Flush and release the file handle; later calls do nothing
    pub fn close(&mut self) -> io::Result<()> {
        if let Sink::File { writer, .. } = self {
            if let Some(writer) = writer.take() {
                writer.into_inner().map_err(|e| e.into_error())?;
            }
        }
        Ok(())
    }

    /// Release the file handle and delete the file
    ///
    /// Only deletes when the handle was still open, so a second call is a
    /// no-op.
    pub fn discard(&mut self) -> io::Result<()> {
        if let Sink::File { path, writer } = self {
            if let Some(writer) = writer.take() {
                drop(writer);
                debug!("removing {}", path.display());
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    /// The file path, for file sinks
    pub fn path(&self) -> Option<&Path> {
        match self {
            Sink::Memory(_) => None,
            Sink::File { path, .. } => Some(path.as_path()),
        }
    }

    /// The collected body, for memory sinks
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Sink::Memory(buf) => Some(buf.as_slice()),
            Sink::File { .. } => None,
        }
    }

    /// Whether a file handle is still held
    pub fn is_open(&self) -> bool {
        matches!(self, Sink::File { writer: Some(_), .. })
    }

    /// Display title: the file's base name, empty for memory sinks
    pub fn title(&self) -> String {
        self.path()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Pick the path a download will be written to
///
/// A missing `path` is used as is. An existing one is removed when
/// `overwrite` is set; otherwise `1_name`, `2_name`, ... in the same
/// directory are tried until one is free.
pub fn resolve_destination(path: &Path, overwrite: bool) -> io::Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    if overwrite {
        fs::remove_file(path)?;
        return Ok(path.to_path_buf());
    }

    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    let mut index = 1u32;
    loop {
        let mut candidate_name = OsString::from(format!("{}_", index));
        candidate_name.push(name);
        let candidate = dir.join(candidate_name);
        if !candidate.exists() {
            return Ok(candidate);
        }
        index += 1;
    }
}
