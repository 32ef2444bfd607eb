//! Structure Materializer: recreate a list of entries on disk.

use std::{
    fmt,
    path::{Component, Path, PathBuf},
};

use {
    tokio::sync::mpsc::UnboundedSender,
    tracing::{debug, warn},
};

use crate::{
    entry::StructureEntry,
    error::{Error, Result},
};

/// Progress notification emitted while materializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Creating item {}/{}...", self.current, self.total)
    }
}

/// What a materialization run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub directories: usize,
    pub files: usize,
    /// Entries dropped because they would land outside the scratch root.
    pub skipped: usize,
}

/// Write `entries` below `root`, in order.
///
/// Directory entries are created idempotently, file entries get their
/// parents created and are overwritten on collision. A [`Progress`] event is
/// sent after every `progress_every`-th entry and after the last one.
pub async fn materialize(
    entries: &[StructureEntry],
    root: &Path,
    progress_every: usize,
    progress: Option<&UnboundedSender<Progress>>,
) -> Result<MaterializeReport> {
    let total = entries.len();
    let mut report = MaterializeReport::default();

    for (idx, entry) in entries.iter().enumerate() {
        let current = idx + 1;

        match resolve_entry_path(&entry.path) {
            Some(rel) => {
                let target = root.join(&rel);
                if entry.is_dir() {
                    tokio::fs::create_dir_all(&target).await.map_err(|e| {
                        Error::archive(format!("cannot create directory {}: {e}", entry.path))
                    })?;
                    report.directories += 1;
                } else {
                    if let Some(parent) = target.parent() {
                        tokio::fs::create_dir_all(parent).await.map_err(|e| {
                            Error::archive(format!("cannot create parent of {}: {e}", entry.path))
                        })?;
                    }
                    tokio::fs::write(&target, entry.content.as_bytes())
                        .await
                        .map_err(|e| Error::archive(format!("cannot write {}: {e}", entry.path)))?;
                    report.files += 1;
                }
            },
            None => {
                warn!(path = %entry.path, "skipping entry outside the scratch directory");
                report.skipped += 1;
            },
        }

        if should_report(current, total, progress_every)
            && let Some(tx) = progress
        {
            // A closed receiver only means nobody is listening any more.
            let _ = tx.send(Progress { current, total });
        }
    }

    debug!(
        total,
        directories = report.directories,
        files = report.files,
        skipped = report.skipped,
        "structure materialized"
    );
    Ok(report)
}

fn should_report(current: usize, total: usize, every: usize) -> bool {
    current == total || (every > 0 && current % every == 0)
}

/// Resolve a user-supplied `/`-separated path to a relative path that stays
/// inside the scratch root.
///
/// Leading separators are ignored and `..` is resolved lexically. Returns
/// `None` when the path escapes the root or names the root itself.
#[must_use]
pub fn resolve_entry_path(raw: &str) -> Option<PathBuf> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => {},
            ".." => {
                parts.pop()?;
            },
            s => {
                // Reject anything the platform would treat as a prefix or root.
                let mut comps = Path::new(s).components();
                match (comps.next(), comps.next()) {
                    (Some(Component::Normal(_)), None) => parts.push(s),
                    _ => return None,
                }
            },
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.iter().collect())
}
