//! Template lookup
//!
//! Templates arrive as a ZIP archive (in memory or on disk) or as a plain
//! directory. Archives are unpacked into the run's scratch directory with
//! every entry path reduced to its normal components.

use std::io::{Cursor, Read, Seek};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{ErrorCode, ReportError, Result};

/// Where a run's templates come from
#[derive(Debug, Clone)]
pub enum TemplateSource {
    Archive(Vec<u8>),
    ArchiveFile(PathBuf),
    Directory(PathBuf),
}

impl TemplateSource {
    /// A `.zip` path is an archive, anything else a directory
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_zip = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip {
            TemplateSource::ArchiveFile(path)
        } else {
            TemplateSource::Directory(path)
        }
    }
}

/// Strip root, prefix, `.` and `..` components
fn sanitize_path(path: &str) -> Option<PathBuf> {
    let mut sanitized = PathBuf::new();
    for component in Path::new(path).components() {
        if let Component::Normal(part) = component {
            sanitized.push(part);
        }
    }
    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

fn archive_error(err: impl std::fmt::Display) -> ReportError {
    ReportError::template(
        ErrorCode::TEMPLATE_ARCHIVE_INVALID,
        format!("template archive is unreadable: {}", err),
    )
}

/// Unpack every file entry of the archive under `dest`; returns the file count
pub fn extract_archive<R: Read + Seek>(reader: R, dest: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(reader).map_err(archive_error)?;
    let mut extracted = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(archive_error)?;
        if entry.is_dir() {
            continue;
        }
        let raw_name = entry.name().to_string();
        let Some(relative) = sanitize_path(&raw_name) else {
            warn!("Skipping archive entry with unusable path: {}", raw_name);
            continue;
        };

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
        extracted += 1;
    }

    debug!("Extracted {} templates into {}", extracted, dest.display());
    Ok(extracted)
}

/// Materialize `source` and return the directory to search for templates
pub async fn prepare(source: &TemplateSource, workdir: &Path) -> Result<PathBuf> {
    let dest = workdir.join("templates");
    match source {
        TemplateSource::Directory(dir) => {
            if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
                return Err(ReportError::template(
                    ErrorCode::TEMPLATE_NOT_FOUND,
                    format!("template directory {} does not exist", dir.display()),
                ));
            }
            Ok(dir.clone())
        }
        TemplateSource::Archive(bytes) => {
            let bytes = bytes.clone();
            let target = dest.clone();
            tokio::task::spawn_blocking(move || extract_archive(Cursor::new(bytes), &target))
                .await
                .map_err(|e| ReportError::other(format!("archive extraction panicked: {}", e)))??;
            Ok(dest)
        }
        TemplateSource::ArchiveFile(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                ReportError::template(
                    ErrorCode::TEMPLATE_NOT_FOUND,
                    format!("cannot read {}: {}", path.display(), e),
                )
            })?;
            let target = dest.clone();
            tokio::task::spawn_blocking(move || extract_archive(Cursor::new(bytes), &target))
                .await
                .map_err(|e| ReportError::other(format!("archive extraction panicked: {}", e)))??;
            Ok(dest)
        }
    }
}

/// Resolve a template by file name: a direct child of `root` first, then the
/// first match of a recursive search in file-name order
pub fn find_template(root: &Path, name: &str) -> Option<PathBuf> {
    let relative = sanitize_path(name)?;
    let direct = root.join(&relative);
    if direct.is_file() {
        return Some(direct);
    }

    let file_name = relative.file_name()?.to_owned();
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
        .map(|entry| entry.into_path())
}
