//! Progress output shared by all workers
//!
//! stdout and stderr sit behind one lock, so a write from one worker always
//! completes before another worker's write starts and lines never interleave.

use colored::Colorize;
use std::fmt::Display;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Streams {
    stdout: Box<dyn Write + Send>,
    stderr: Box<dyn Write + Send>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Handle to the serialized progress stream
#[derive(Clone)]
pub struct Console {
    streams: Arc<Mutex<Streams>>,
}

/// Lock-wrapped writer over one of the console's streams
///
/// Each `write` call writes the whole buffer while holding the console lock.
#[derive(Clone)]
pub struct LockedWriter {
    console: Console,
    stream: Stream,
}

impl Console {
    pub fn new<O, E>(stdout: O, stderr: E) -> Self
    where
        O: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        Self {
            streams: Arc::new(Mutex::new(Streams {
                stdout: Box::new(stdout),
                stderr: Box::new(stderr),
            })),
        }
    }

    /// Console over the process's own stdout and stderr
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    /// Console that discards everything
    pub fn sink() -> Self {
        Self::new(io::sink(), io::sink())
    }

    fn lock(&self) -> MutexGuard<'_, Streams> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stdout(&self) -> LockedWriter {
        LockedWriter {
            console: self.clone(),
            stream: Stream::Stdout,
        }
    }

    pub fn stderr(&self) -> LockedWriter {
        LockedWriter {
            console: self.clone(),
            stream: Stream::Stderr,
        }
    }

    /// Writes one line to stdout in a single locked write
    pub fn line<T: Display>(&self, text: T) {
        self.emit(Stream::Stdout, text);
    }

    /// Writes one line to stderr in a single locked write
    pub fn error_line<T: Display>(&self, text: T) {
        self.emit(Stream::Stderr, text);
    }

    fn emit<T: Display>(&self, stream: Stream, text: T) {
        let line = format!("{}\n", text);
        if let Err(e) = self.stream_writer(stream).write_all(line.as_bytes()) {
            log::error!("progress output write failed: {}", e);
        }
    }

    fn stream_writer(&self, stream: Stream) -> LockedWriter {
        LockedWriter {
            console: self.clone(),
            stream,
        }
    }

    pub fn blank(&self) {
        self.line("");
    }

    /// Per-repository banner: path plus collection slug
    pub fn repo_header(&self, repo_dir: &Path, slug: &str) {
        self.line(format!(
            "\n{}\n{}",
            format!("==> {}", repo_dir.display()).magenta(),
            format!("    collection: {}", slug).dimmed()
        ));
    }

    pub fn info<T: Display>(&self, msg: T) {
        self.line(format!("    - {}", msg).blue());
    }

    pub fn warn<T: Display>(&self, msg: T) {
        self.line(format!("    ! {}", msg).yellow());
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

impl Write for LockedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut streams = self.console.lock();
        let target = match self.stream {
            Stream::Stdout => &mut streams.stdout,
            Stream::Stderr => &mut streams.stderr,
        };
        target.write_all(buf)?;
        target.flush()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut streams = self.console.lock();
        match self.stream {
            Stream::Stdout => streams.stdout.flush(),
            Stream::Stderr => streams.stderr.flush(),
        }
    }
}
