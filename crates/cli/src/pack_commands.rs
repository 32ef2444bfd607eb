//! `fsbot pack`: the archive pipeline without Telegram.

use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    fsbot_config::StructureConfig,
    fsbot_structure::{ArchiveFormat, InputKind, entry, job},
    tokio::sync::mpsc,
};

pub struct PackRequest<'a> {
    pub file: &'a Path,
    pub format: Option<ArchiveFormat>,
    pub out: &'a Path,
    pub base_name: &'a str,
    pub user: u64,
}

/// Parse `req.file`, build the archive and copy it into `req.out`.
///
/// Returns the path of the written archive.
pub async fn pack(settings: &StructureConfig, req: PackRequest<'_>) -> anyhow::Result<PathBuf> {
    let raw = tokio::fs::read_to_string(req.file)
        .await
        .with_context(|| format!("failed to read {}", req.file.display()))?;

    let file_name = req.file.file_name().and_then(|n| n.to_str());
    let (entries, file_format) = match InputKind::from_file_name(file_name) {
        InputKind::Json => {
            let spec = entry::parse_json(&raw)?;
            (spec.entries, spec.format)
        },
        InputKind::Lines => (entry::parse_lines(&raw)?, None),
    };
    entry::ensure_within_limit(&entries, settings.max_entries)?;
    let format = req.format.or(file_format).unwrap_or_default();

    tokio::fs::create_dir_all(req.out).await?;
    let out = req.out.to_path_buf();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            eprintln!("{progress}");
        }
    });

    let written = job::build_and_deliver(
        &settings.resolved_work_dir(),
        req.user,
        &entries,
        format,
        req.base_name,
        settings.progress_every,
        Some(&tx),
        |built| async move {
            let dest = out.join(&built.file_name);
            tokio::fs::copy(&built.path, &dest).await?;
            Ok::<_, fsbot_structure::Error>(dest)
        },
    )
    .await?;

    drop(tx);
    let _ = printer.await;
    Ok(written)
}
