use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{TransferError, TransferResult};

/// Atomically promote a temporary artifact to its final name. Rename is a
/// single atomic step on the same filesystem; when the rename itself fails
/// (cross-device placement) a copy-then-remove fallback is attempted, and
/// only after both fail is the error surfaced.
pub fn promote(temp: &Path, dest: &Path) -> TransferResult<()> {
    match fs::rename(temp, dest) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            log::debug!(
                "rename {} -> {} failed ({}), copying instead",
                temp.display(),
                dest.display(),
                rename_err
            );
            fs::copy(temp, dest)
                .map_err(|err| TransferError::Finalize(err.to_string()))?;
            fs::remove_file(temp)
                .map_err(|err| TransferError::Finalize(err.to_string()))?;
            Ok(())
        }
    }
}

/// Size of a file, treating any stat failure as "absent".
pub fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).ok().filter(|meta| meta.is_file()).map(|meta| meta.len())
}

pub fn ensure_parent_dir(path: &Path) -> TransferResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| TransferError::Io(err.to_string()))?;
        }
    }
    Ok(())
}

/// Resolve the caller-supplied destination. An empty or directory-like
/// value takes its filename from the URL path.
pub fn resolve_dest_path(dest: &str, url: &str) -> PathBuf {
    let dest = dest.trim();
    let treat_as_dir = dest.is_empty()
        || dest.ends_with('/')
        || dest.ends_with('\\')
        || Path::new(dest).is_dir();
    if !treat_as_dir {
        return PathBuf::from(dest);
    }
    let filename = filename_from_url(url).unwrap_or_else(|| "download.bin".to_string());
    let base = if dest.is_empty() { Path::new(".") } else { Path::new(dest) };
    base.join(filename)
}

fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let name = parsed.path().rsplit('/').next().unwrap_or("");
    if name.is_empty() {
        None
    } else {
        Some(sanitize_filename(name))
    }
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-' | ' ' | '(' | ')' | '[' | ']') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(&[' ', '.', '_'][..]);
    if trimmed.is_empty() {
        "download.bin".to_string()
    } else {
        trimmed.to_string()
    }
}
