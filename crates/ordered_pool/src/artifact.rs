//! Filesystem protocol for signalling "worker output is complete".
//!
//! Every pool instance claims a private temporary directory. Within it a
//! unit's output lives at `NNNNNN-<pool>` (zero-padded sequence number plus
//! pool name); while the worker is still producing output the file carries
//! the reserved `.part` suffix. Publishing is a single `rename` from the
//! provisional name to the final one, so partial content is never visible
//! under the final name and a worker crash before the rename leaves nothing
//! behind that could be mistaken for a result.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Reserved suffix distinguishing "in progress" from "published".
pub(crate) const PROVISIONAL_SUFFIX: &str = "part";

/// The pool-private namespace all artifacts are created under.
pub(crate) struct ArtifactLayout {
    dir: TempDir,
    pool_name: String,
}

impl ArtifactLayout {
    /// Claims a fresh temporary directory prefixed with the pool name.
    pub(crate) fn claim(pool_name: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{pool_name}_"))
            .tempdir()
            .with_context(|| format!("Failed to claim artifact directory for pool '{pool_name}'"))?;
        Ok(Self {
            dir,
            pool_name: pool_name.to_string(),
        })
    }

    /// Derives the provisional/final path pair for one sequence number.
    pub(crate) fn paths_for(&self, sequence: u64) -> ArtifactPaths {
        let final_path = self
            .dir
            .path()
            .join(format!("{:06}-{}", sequence, self.pool_name));
        let provisional = self
            .dir
            .path()
            .join(format!("{:06}-{}.{}", sequence, self.pool_name, PROVISIONAL_SUFFIX));
        ArtifactPaths {
            provisional,
            final_path,
        }
    }
}

/// Where one unit's output lives while in progress and once published.
#[derive(Clone, Debug)]
pub(crate) struct ArtifactPaths {
    pub(crate) provisional: PathBuf,
    pub(crate) final_path: PathBuf,
}

impl ArtifactPaths {
    pub(crate) fn provisional_exists(&self) -> bool {
        self.provisional.exists()
    }

    pub(crate) fn final_exists(&self) -> bool {
        self.final_path.exists()
    }

    pub(crate) fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Best-effort removal of a failed worker's partial output, so the unit
    /// reads as crashed rather than still running.
    pub(crate) fn discard_provisional(&self) {
        let _ = fs::remove_file(&self.provisional);
    }
}

/// Writes each produced line to the provisional path, then atomically
/// publishes the artifact under its final name. Runs inside the worker.
pub(crate) fn write_and_publish<I>(paths: &ArtifactPaths, lines: I) -> Result<()>
where
    I: IntoIterator<Item = String>,
{
    let file = File::create(&paths.provisional).with_context(|| {
        format!(
            "Failed to create provisional artifact {}",
            paths.provisional.display()
        )
    })?;
    let mut out = BufWriter::new(file);
    for line in lines {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()
        .with_context(|| format!("Failed to flush {}", paths.provisional.display()))?;
    drop(out);

    fs::rename(&paths.provisional, &paths.final_path).with_context(|| {
        format!(
            "Failed to publish artifact {} -> {}",
            paths.provisional.display(),
            paths.final_path.display()
        )
    })
}
