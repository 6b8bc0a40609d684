//! Confinement of caller-supplied relative paths to an authorized root.
//!
//! Confinement is two-phase:
//! 1. [`PathGuard::confine`] is purely lexical and never touches the filesystem.
//!    It decodes the input once, rejects absolute input, resolves the
//!    segments (split on both `/` and `\`) against the root, and rejects the
//!    result when it no longer starts with the root.
//! 2. [`ConfinedPath::open_checked`] runs later, checks existence first and
//!    then re-checks containment after resolving symlinks on both sides.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{FsOpsError, FsOpsResult};

/// Lexical confinement against one fixed root.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Build a guard for `root`, normalising `.`/`..` components lexically.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::PathRejected`] when `root` is relative or
    /// normalises above the filesystem root.
    pub fn new(root: impl Into<PathBuf>) -> FsOpsResult<Self> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(FsOpsError::rejected("relative_root"));
        }
        let root = normalize_lexically(&root).ok_or(FsOpsError::rejected("invalid_root"))?;
        Ok(Self { root })
    }

    /// Authorized root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Confine `raw` (a URL path tail, still percent-encoded) under the root.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::PathRejected`] with one of the reasons
    /// `invalid_encoding`, `nul_byte`, `absolute_path`, `drive_prefix`, or
    /// `traversal`.
    pub fn confine(&self, raw: &str) -> FsOpsResult<ConfinedPath> {
        let decoded = urlencoding::decode(raw)
            .map_err(|_| FsOpsError::rejected("invalid_encoding"))?;
        reject_absolute(&decoded)?;
        let full = resolve_under(&self.root, &decoded);
        let relative = full
            .strip_prefix(&self.root)
            .map_err(|_| FsOpsError::rejected("traversal"))?
            .to_path_buf();
        Ok(ConfinedPath {
            root: self.root.clone(),
            relative,
            full,
        })
    }

    /// URL path tail (percent-encoded, `/`-separated) addressing `stored`
    /// relative to the root, or `None` when `stored` lies outside it.
    #[must_use]
    pub fn download_href(&self, stored: &Path) -> Option<String> {
        if !stored.is_absolute() {
            return None;
        }
        let normalized = normalize_lexically(stored)?;
        let relative = normalized.strip_prefix(&self.root).ok()?;
        let segments = relative
            .components()
            .map(|component| match component {
                Component::Normal(segment) => segment.to_str().map(urlencoding::encode),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        (!segments.is_empty()).then(|| segments.join("/"))
    }
}

/// Confine `raw` under `root` in one call.
///
/// # Errors
///
/// See [`PathGuard::new`] and [`PathGuard::confine`].
pub fn confine(raw: &str, root: &Path) -> FsOpsResult<ConfinedPath> {
    PathGuard::new(root)?.confine(raw)
}

/// Absolute path lexically rooted under the guard's root.
///
/// Only constructible through [`PathGuard::confine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfinedPath {
    root: PathBuf,
    relative: PathBuf,
    full: PathBuf,
}

impl ConfinedPath {
    /// Absolute confined path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.full
    }

    /// Path relative to the root.
    #[must_use]
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Final path segment, used for `Content-Disposition`.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.full
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Check that the path names an existing regular file that still lives
    /// under the root once symlinks are resolved.
    ///
    /// Existence is evaluated before containment, so a dangling link is
    /// reported as missing.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::PathMissing`] when nothing (or a directory)
    /// exists at the path, [`FsOpsError::PathRejected`] with reason
    /// `symlink_escape` when resolution leaves the root, and
    /// [`FsOpsError::Io`] for other filesystem failures.
    pub async fn open_checked(&self) -> FsOpsResult<CheckedFile> {
        let metadata = match tokio::fs::metadata(&self.full).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(FsOpsError::PathMissing {
                    path: self.full.clone(),
                });
            }
            Err(source) => {
                return Err(FsOpsError::Io {
                    operation: "guard.metadata",
                    path: self.full.clone(),
                    source,
                });
            }
        };
        if !metadata.is_file() {
            debug!(path = %self.full.display(), "confined path is not a regular file");
            return Err(FsOpsError::PathMissing {
                path: self.full.clone(),
            });
        }

        let root = canonicalize("guard.canonicalize_root", &self.root).await?;
        let resolved = canonicalize("guard.canonicalize_target", &self.full).await?;
        if !resolved.starts_with(&root) {
            warn!(
                relative = %self.relative.display(),
                "confined path resolves outside the download root"
            );
            return Err(FsOpsError::rejected("symlink_escape"));
        }

        Ok(CheckedFile {
            file_name: self.file_name(),
            len: metadata.len(),
            path: resolved,
        })
    }
}

/// Regular file that passed every guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedFile {
    /// Fully resolved path.
    pub path: PathBuf,
    /// Download file name.
    pub file_name: String,
    /// Size in bytes at check time.
    pub len: u64,
}

async fn canonicalize(operation: &'static str, path: &Path) -> FsOpsResult<PathBuf> {
    tokio::fs::canonicalize(path)
        .await
        .map_err(|source| FsOpsError::Io {
            operation,
            path: path.to_path_buf(),
            source,
        })
}

fn reject_absolute(decoded: &str) -> FsOpsResult<()> {
    if decoded.contains('\0') {
        return Err(FsOpsError::rejected("nul_byte"));
    }
    if decoded.starts_with(['/', '\\']) {
        return Err(FsOpsError::rejected("absolute_path"));
    }
    if has_drive_prefix(decoded) {
        return Err(FsOpsError::rejected("drive_prefix"));
    }
    Ok(())
}

/// Join `decoded` onto `root` and fold `.`/`..` lexically. `..` may climb
/// above the root; containment is decided on the result.
fn resolve_under(root: &Path, decoded: &str) -> PathBuf {
    let mut full = root.to_path_buf();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                full.pop();
            }
            other => full.push(other),
        }
    }
    full
}

fn has_drive_prefix(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
        }
    }
    Some(normalized)
}
