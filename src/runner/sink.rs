use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Destination for rendered log lines.
pub trait LogSink: Send {
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Called once per cycle after the batch has been written.
    fn flush(&mut self) -> io::Result<()>;
}

/// Newline-delimited output file, truncated on open, optionally mirrored to
/// stdout.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    mirror_stdout: bool,
    lines_written: u64,
}

impl FileSink {
    pub fn create(path: &Path, mirror_stdout: bool) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("failed to open output file '{}': {}", path.display(), e),
                )
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            mirror_stdout,
            lines_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }
}

impl LogSink for FileSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        if self.mirror_stdout {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", line)?;
        }
        writeln!(self.writer, "{}", line)?;
        self.lines_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.mirror_stdout {
            io::stdout().flush()?;
        }
        self.writer.flush()
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // BufWriter flushes on drop but swallows the error; surface it in logs.
        if let Err(e) = self.writer.flush() {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to flush output file");
        }
    }
}

/// Collects lines in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub lines: Vec<String>,
    pub flushes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogSink for MemorySink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
