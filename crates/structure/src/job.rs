//! One structure-to-archive run and its scratch resources.

use std::path::{Path, PathBuf};

use {
    tempfile::TempDir,
    tokio::sync::mpsc::UnboundedSender,
    tracing::{info, warn},
};

use crate::{
    archive::{self, ArchiveFormat},
    entry::StructureEntry,
    error::{Context, Error, Result},
    materialize::{self, MaterializeReport, Progress},
};

const STAGING_DIR: &str = "tree";

/// Scratch area for a single request: a staging tree plus the output archive.
///
/// Everything lives under one randomized, user-scoped temporary directory
/// that is removed by [`ArchiveJob::cleanup`] or, failing that, on drop.
pub struct ArchiveJob {
    scratch: TempDir,
    user: u64,
}

/// A finished archive waiting to be delivered.
#[derive(Debug, Clone)]
pub struct BuiltArchive {
    pub path: PathBuf,
    pub file_name: String,
    pub format: ArchiveFormat,
    pub size: u64,
    pub report: MaterializeReport,
}

impl ArchiveJob {
    /// Create the scratch directory for `user` under `work_dir`.
    pub fn new(work_dir: &Path, user: u64) -> Result<Self> {
        std::fs::create_dir_all(work_dir)
            .with_context(|| format!("cannot create work directory {}", work_dir.display()))?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("fsbot-{user}-"))
            .tempdir_in(work_dir)
            .context("cannot create scratch directory")?;
        Ok(Self { scratch, user })
    }

    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Materialize `entries` and pack them as `{base_name}_{user}.{ext}`.
    pub async fn build(
        &self,
        entries: &[StructureEntry],
        format: ArchiveFormat,
        base_name: &str,
        progress_every: usize,
        progress: Option<&UnboundedSender<Progress>>,
    ) -> Result<BuiltArchive> {
        let staging = self.scratch.path().join(STAGING_DIR);
        tokio::fs::create_dir(&staging).await?;

        let report = materialize::materialize(entries, &staging, progress_every, progress).await?;

        let file_name = format.file_name(base_name, self.user);
        let path = self.scratch.path().join(&file_name);
        let size = archive::package(&staging, &path, format).await?;

        info!(
            user = self.user,
            %format,
            entries = entries.len(),
            files = report.files,
            directories = report.directories,
            skipped = report.skipped,
            size,
            "archive built"
        );

        Ok(BuiltArchive {
            path,
            file_name,
            format,
            size,
            report,
        })
    }

    /// Remove the scratch directory and everything in it.
    pub fn cleanup(self) {
        let path = self.scratch.path().to_path_buf();
        if let Err(e) = self.scratch.close() {
            warn!(path = %path.display(), error = %e, "failed to remove scratch directory");
        }
    }
}

/// Build an archive and hand it to `deliver`, removing all scratch state
/// afterwards whatever the outcome.
#[allow(clippy::too_many_arguments)]
pub async fn build_and_deliver<F, Fut, T, E>(
    work_dir: &Path,
    user: u64,
    entries: &[StructureEntry],
    format: ArchiveFormat,
    base_name: &str,
    progress_every: usize,
    progress: Option<&UnboundedSender<Progress>>,
    deliver: F,
) -> std::result::Result<T, E>
where
    F: FnOnce(BuiltArchive) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: From<Error>,
{
    let job = ArchiveJob::new(work_dir, user)?;
    let outcome = match job
        .build(entries, format, base_name, progress_every, progress)
        .await
    {
        Ok(built) => deliver(built).await,
        Err(e) => Err(E::from(e)),
    };
    job.cleanup();
    outcome
}
