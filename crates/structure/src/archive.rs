//! Archive Packager: pack a directory tree into a zip or tar.gz file.
//!
//! The packed tree's contents sit at the archive root; the directory itself
//! is never a top-level entry.

use std::{
    fmt,
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use {
    flate2::{Compression, write::GzEncoder},
    tracing::{debug, warn},
    walkdir::WalkDir,
    zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions},
};

use crate::error::{Error, Result};

/// Supported output formats, spelled `zip` and `tar.gz` in commands and payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    #[default]
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Interpret an optional command argument; anything unrecognized is zip.
    #[must_use]
    pub fn from_arg(arg: Option<&str>) -> Self {
        arg.and_then(|a| a.parse().ok()).unwrap_or_default()
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }

    /// Archive file name for `base_name` built for `user`.
    #[must_use]
    pub fn file_name(self, base_name: &str, user: u64) -> String {
        format!("{base_name}_{user}.{}", self.extension())
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "zip" => Ok(Self::Zip),
            "tar.gz" => Ok(Self::TarGz),
            other => Err(Error::parse(format!(
                "unsupported archive format: {other} (expected zip or tar.gz)"
            ))),
        }
    }
}

/// Pack `root` into `dest` using `format`.
///
/// Runs the codec on the blocking pool. A partially written `dest` is
/// removed before the error is returned.
pub async fn package(root: &Path, dest: &Path, format: ArchiveFormat) -> Result<u64> {
    let root = root.to_path_buf();
    let dest_owned = dest.to_path_buf();
    let outcome = tokio::task::spawn_blocking(move || write_archive(&root, &dest_owned, format))
        .await
        .map_err(Error::from)
        .and_then(|res| res);

    match outcome {
        Ok(size) => {
            debug!(path = %dest.display(), %format, size, "archive written");
            Ok(size)
        },
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(dest)
                && rm.kind() != io::ErrorKind::NotFound
            {
                warn!(path = %dest.display(), error = %rm, "failed to remove partial archive");
            }
            Err(e)
        },
    }
}

/// Synchronous packer; returns the archive size in bytes.
pub fn write_archive(root: &Path, dest: &Path, format: ArchiveFormat) -> Result<u64> {
    let file = File::create(dest)
        .map_err(|e| Error::archive(format!("cannot create {}: {e}", dest.display())))?;
    let file = match format {
        ArchiveFormat::Zip => write_zip(root, file),
        ArchiveFormat::TarGz => write_tar_gz(root, file),
    }?;
    let size = file
        .metadata()
        .map_err(|e| Error::archive(format!("cannot stat archive: {e}")))?
        .len();
    Ok(size)
}

/// Walk `root` in name order, yielding (absolute path, relative `/` path, is_dir).
fn tree_entries(root: &Path) -> Result<Vec<(PathBuf, String, bool)>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::archive(format!("cannot walk scratch tree: {e}")))?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::archive(e.to_string()))?;
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        out.push((entry.path().to_path_buf(), rel, entry.file_type().is_dir()));
    }
    Ok(out)
}

fn write_zip(root: &Path, file: File) -> Result<File> {
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path, rel, is_dir) in tree_entries(root)? {
        if is_dir {
            writer
                .add_directory(format!("{rel}/"), options)
                .map_err(|e| Error::archive(format!("zip entry {rel}/: {e}")))?;
            continue;
        }
        writer
            .start_file(rel.as_str(), options)
            .map_err(|e| Error::archive(format!("zip entry {rel}: {e}")))?;
        let mut src = File::open(&path)?;
        io::copy(&mut src, &mut writer)
            .map_err(|e| Error::archive(format!("zip entry {rel}: {e}")))?;
    }

    let mut file = writer
        .finish()
        .map_err(|e| Error::archive(format!("cannot finalize zip: {e}")))?;
    file.flush()?;
    Ok(file)
}

fn write_tar_gz(root: &Path, file: File) -> Result<File> {
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.mode(tar::HeaderMode::Deterministic);

    for (path, rel, is_dir) in tree_entries(root)? {
        let res = if is_dir {
            builder.append_dir(&rel, &path)
        } else {
            builder.append_path_with_name(&path, &rel)
        };
        res.map_err(|e| Error::archive(format!("tar entry {rel}: {e}")))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| Error::archive(format!("cannot finalize tar: {e}")))?;
    let mut file = encoder
        .finish()
        .map_err(|e| Error::archive(format!("cannot finalize gzip stream: {e}")))?;
    file.flush()?;
    Ok(file)
}

/// Read every file of an archive into `(relative path, bytes)` pairs, with
/// directories reported as `path/` and empty bytes. Test helper shared with
/// the transport crate's flow tests.
#[doc(hidden)]
pub fn read_archive(bytes: &[u8], format: ArchiveFormat) -> Result<Vec<(String, Vec<u8>)>> {
    use std::io::Read;

    let mut out = Vec::new();
    match format {
        ArchiveFormat::Zip => {
            let mut archive = zip::ZipArchive::new(io::Cursor::new(bytes))
                .map_err(|e| Error::archive(e.to_string()))?;
            for i in 0..archive.len() {
                let mut entry = archive
                    .by_index(i)
                    .map_err(|e| Error::archive(e.to_string()))?;
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                out.push((entry.name().to_string(), data));
            }
        },
        ArchiveFormat::TarGz => {
            let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(bytes));
            for entry in archive.entries()? {
                let mut entry = entry?;
                let mut name = entry.path()?.to_string_lossy().into_owned();
                if entry.header().entry_type().is_dir() && !name.ends_with('/') {
                    name.push('/');
                }
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                out.push((name, data));
            }
        },
    }
    Ok(out)
}
