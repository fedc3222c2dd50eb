//! The aggregate output sink the sequencer feeds.
//!
//! Two mutually exclusive modes, chosen at construction:
//! - `lines`: each consumed unit's lines are appended to one writer, so the
//!   pool's combined output reads as a single ordered stream.
//! - `artifacts`: a caller-supplied callback receives the path of each fully
//!   published artifact instead, and does its own reading. The file is
//!   deleted after the callback returns.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Destination for consumed unit output.
pub struct OutputSink {
    mode: SinkMode,
}

enum SinkMode {
    Lines(Box<dyn Write + Send>),
    Artifacts(Box<dyn FnMut(&Path) -> Result<()> + Send>),
}

impl OutputSink {
    /// Streams every unit's lines, in submission order, into `writer`.
    pub fn lines(writer: impl Write + Send + 'static) -> Self {
        Self {
            mode: SinkMode::Lines(Box::new(writer)),
        }
    }

    /// Hands each unit's published artifact path to `callback` instead of
    /// streaming its contents. The artifact is complete when the callback
    /// runs and is deleted once it returns.
    pub fn artifacts(callback: impl FnMut(&Path) -> Result<()> + Send + 'static) -> Self {
        Self {
            mode: SinkMode::Artifacts(Box::new(callback)),
        }
    }

    /// Forwards one published artifact: byte-copy into the line stream, or
    /// hand the path to the callback. Deletion is the caller's job.
    pub(crate) fn forward_file(&mut self, path: &Path) -> Result<()> {
        match &mut self.mode {
            SinkMode::Lines(writer) => {
                let mut file = File::open(path)
                    .with_context(|| format!("Failed to open artifact {}", path.display()))?;
                io::copy(&mut file, writer)
                    .with_context(|| format!("Failed to stream artifact {}", path.display()))?;
                writer.flush()?;
                Ok(())
            }
            SinkMode::Artifacts(callback) => callback(path),
        }
    }

    /// Degraded-mode path: consume a unit's lines directly, no worker and no
    /// published artifact. In artifacts mode the lines are staged in a
    /// temporary file so the callback contract still holds.
    pub(crate) fn consume_lines<I>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        match &mut self.mode {
            SinkMode::Lines(writer) => {
                for line in lines {
                    writer.write_all(line.as_bytes())?;
                    writer.write_all(b"\n")?;
                }
                writer.flush()?;
                Ok(())
            }
            SinkMode::Artifacts(callback) => {
                let mut staged = tempfile::NamedTempFile::new()
                    .context("Failed to stage synchronous output")?;
                for line in lines {
                    staged.write_all(line.as_bytes())?;
                    staged.write_all(b"\n")?;
                }
                staged.flush()?;
                callback(staged.path())
            }
        }
    }
}
