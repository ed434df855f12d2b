// src/sink.rs

//! Destinations for rendered entries.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// An output that rendered entries are written to.
///
/// Sinks are only ever used from the dispatch loop, so writes are never concurrent.
pub trait Sink: Send {
    /// A name for the sink, used in diagnostics.
    fn name(&self) -> &str;

    /// Append one rendered `line`. Implementations add the line terminator.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` from the underlying output.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Flush any buffered output.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` from the underlying output.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A [`Sink`] that writes lines to any [`Write`] implementation.
///
/// Each line is flushed as soon as it is written, so output is visible promptly (and a file sink
/// can be dropped at any time without losing lines).
#[derive(Debug)]
pub struct WriterSink<W> {
    name: String,
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wrap `writer` as a sink called `name`.
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
        }
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// A sink that writes to standard output.
#[must_use]
pub fn stdout() -> WriterSink<io::Stdout> {
    WriterSink::new("stdout", io::stdout())
}

/// A sink that appends to the file at `path`, creating it if necessary.
///
/// # Errors
///
/// Propagates any `io::Error` from opening the file.
pub fn file(path: &Path) -> io::Result<WriterSink<File>> {
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    Ok(WriterSink::new(path.display().to_string(), file))
}
