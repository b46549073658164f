//! Recursive asset copying.
//!
//! Mirrors a source directory into a destination: every subdirectory is
//! created, every file is copied over whatever already sits at the same
//! relative path. Files at the destination with no source counterpart are left
//! alone. Used for per-class `img/` directories and the shared `css/` bundle.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CopyError {
    #[error("Source directory does not exist or could not be found: {0}")]
    SourceMissing(PathBuf),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

/// What a copy touched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub dirs: usize,
}

impl fmt::Display for CopyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.files, self.dirs) {
            (1, 0) => write!(f, "1 file"),
            (n, 0) => write!(f, "{n} files"),
            (n, d) => write!(f, "{n} files in {} directories", d + 1),
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CopyError + '_ {
    move |source| CopyError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Copy the whole of `src` into `dst`, creating `dst` if needed.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<CopyStats, CopyError> {
    if !src.is_dir() {
        return Err(CopyError::SourceMissing(src.to_path_buf()));
    }
    fs::create_dir_all(dst).map_err(io_err(dst))?;

    let mut stats = CopyStats::default();
    for entry in WalkDir::new(src)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
            stats.dirs += 1;
        } else {
            fs::copy(entry.path(), &target).map_err(io_err(entry.path()))?;
            stats.files += 1;
        }
    }

    debug!(src = %src.display(), dst = %dst.display(), %stats, "copied directory");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn missing_source_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = copy_dir(&tmp.path().join("img"), &tmp.path().join("out"));

        assert!(matches!(result, Err(CopyError::SourceMissing(_))));
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn copies_nested_tree() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("css");
        write(&src.join("style.css"), "body {}");
        write(&src.join("fonts/a.woff"), "font");
        write(&src.join("fonts/extra/b.woff"), "font b");

        let dst = tmp.path().join("out/css");
        let stats = copy_dir(&src, &dst).unwrap();

        assert_eq!(stats, CopyStats { files: 3, dirs: 2 });
        assert_eq!(fs::read_to_string(dst.join("style.css")).unwrap(), "body {}");
        assert_eq!(fs::read_to_string(dst.join("fonts/extra/b.woff")).unwrap(), "font b");
    }

    #[test]
    fn empty_source_creates_destination() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("img");
        fs::create_dir_all(&src).unwrap();

        let dst = tmp.path().join("out/img");
        let stats = copy_dir(&src, &dst).unwrap();

        assert_eq!(stats, CopyStats::default());
        assert!(dst.is_dir());
    }

    #[test]
    fn overwrites_existing_and_keeps_unrelated() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("img");
        write(&src.join("a.png"), "new bytes");

        let dst = tmp.path().join("out");
        write(&dst.join("a.png"), "old bytes, longer than the new ones");
        write(&dst.join("stale.png"), "predates the copy");

        copy_dir(&src, &dst).unwrap();

        assert_eq!(fs::read(dst.join("a.png")).unwrap(), b"new bytes");
        assert_eq!(fs::read_to_string(dst.join("stale.png")).unwrap(), "predates the copy");
    }

    #[test]
    fn copy_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("img");
        write(&src.join("sub/a.png"), "a");

        let dst = tmp.path().join("out");
        let first = copy_dir(&src, &dst).unwrap();
        let second = copy_dir(&src, &dst).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(dst.join("sub/a.png")).unwrap(), "a");
    }

    #[test]
    fn stats_display() {
        assert_eq!(CopyStats { files: 1, dirs: 0 }.to_string(), "1 file");
        assert_eq!(CopyStats { files: 4, dirs: 0 }.to_string(), "4 files");
        assert_eq!(
            CopyStats { files: 4, dirs: 1 }.to_string(),
            "4 files in 2 directories"
        );
    }
}
