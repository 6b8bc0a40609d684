//! On-disk fixtures: survey trees and stand-in conversion tools.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Temporary directory pair mirroring a deployment: a download root holding
/// survey files and a viewer root receiving converter output.
pub struct SurveyTree {
    dir: TempDir,
}

impl SurveyTree {
    /// Create empty `downloads/` and `viewer/` directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directories cannot be created.
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("failed to create survey tempdir")?;
        fs::create_dir_all(dir.path().join("downloads"))
            .context("failed to create download root")?;
        fs::create_dir_all(dir.path().join("viewer")).context("failed to create viewer root")?;
        Ok(Self { dir })
    }

    /// Directory that served downloads are confined to.
    #[must_use]
    pub fn download_root(&self) -> PathBuf {
        self.dir.path().join("downloads")
    }

    /// Directory the converter writes viewer pages into.
    #[must_use]
    pub fn viewer_root(&self) -> PathBuf {
        self.dir.path().join("viewer")
    }

    /// Directory outside both roots, for escape attempts.
    #[must_use]
    pub fn outside(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Write `contents` at `relative` under the download root, creating parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn add_file(&self, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        write_file(&self.download_root().join(relative), contents)
    }

    /// Write `contents` at `relative` next to (not inside) the download root.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn add_outside_file(&self, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        write_file(&self.outside().join(relative), contents)
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Write an executable `sh` script named `name` into `dir`.
///
/// The script body runs with the invocation's arguments in `"$@"`.
///
/// # Errors
///
/// Returns an error if the script cannot be written or marked executable.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = write_file(&dir.join(name), format!("#!/bin/sh\n{body}\n").as_bytes())?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("failed to mark {} executable", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_land_under_the_download_root() -> Result<()> {
        let tree = SurveyTree::new()?;
        let path = tree.add_file("site1/ortho.tif", b"tiff")?;
        assert!(path.starts_with(tree.download_root()));
        assert_eq!(fs::read(&path)?, b"tiff");

        let outside = tree.add_outside_file("secret.txt", b"nope")?;
        assert!(!outside.starts_with(tree.download_root()));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn fake_tools_are_executable() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let tree = SurveyTree::new()?;
        let tool = fake_tool(&tree.outside(), "lasinfo", "exit 0")?;
        let mode = fs::metadata(&tool)?.permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
        Ok(())
    }
}
