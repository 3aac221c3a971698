/// Safe replacement of dump files on disk
use crate::encoding::{encode_dump, FileMetadata};
use chrono::Local;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BackupOutcome {
    /// Copy of the previous file, when there was one.
    pub backup_path: Option<PathBuf>,
    pub final_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("could not create backup: {0}")]
    BackupCreate(String),
}

/// `<file name>.<YYYYmmddHHMMSS>.bak` next to `target`.
pub fn backup_path_for(target: &Path) -> Option<PathBuf> {
    let name = target.file_name()?.to_string_lossy();
    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    Some(target.with_file_name(format!("{}.{}.bak", name, timestamp)))
}

/// Copy any existing `target` aside, then replace it through a temporary
/// file in the same directory.
pub fn backup_and_swap(target: &Path, contents: &[u8]) -> Result<BackupOutcome, BackupError> {
    let dir = target
        .parent()
        .ok_or_else(|| BackupError::BackupCreate("target has no parent directory".into()))?;
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir)?;
    }

    let backup_path = if target.exists() {
        Some(copy_aside(target)?)
    } else {
        None
    };

    let staged = staging_path(target);
    if let Err(err) = stage(&staged, contents).and_then(|_| fs::rename(&staged, target)) {
        let _ = fs::remove_file(&staged);
        return Err(err.into());
    }

    Ok(BackupOutcome {
        backup_path,
        final_path: target.to_path_buf(),
    })
}

fn copy_aside(target: &Path) -> Result<PathBuf, BackupError> {
    let backup = backup_path_for(target)
        .ok_or_else(|| BackupError::BackupCreate("target has no file name".into()))?;
    fs::copy(target, &backup).map_err(|err| {
        log::warn!("backup of {} failed: {}", target.display(), err);
        BackupError::BackupCreate(err.to_string())
    })?;
    Ok(backup)
}

fn stage(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Encode `text` with the original layout and swap it into place.
pub fn write_dump_with_backup(
    target: &Path,
    text: &str,
    metadata: &FileMetadata,
) -> Result<BackupOutcome, BackupError> {
    backup_and_swap(target, &encode_dump(text, metadata))
}

/// `<file name>.tmp<pid>` beside the target.
fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dump".to_string());
    target.with_file_name(format!("{}.tmp{}", name, std::process::id()))
}
