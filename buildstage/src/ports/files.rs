//! File-system port.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// File operations used by stage bodies.
///
/// Relative paths are resolved against [`FileAccess::root`].
#[async_trait]
pub trait FileAccess: Send + Sync {
    /// The project root.
    fn root(&self) -> &Path;

    /// Resolves `path` against the root.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root().join(path)
        }
    }

    /// Returns `path` relative to the root when it lies inside it.
    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(self.root())
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
    }

    /// Returns true if the path exists.
    async fn exists(&self, path: &Path) -> bool;

    /// Returns true if the path is a regular file.
    async fn is_file(&self, path: &Path) -> bool;

    /// Returns true if the path is a directory.
    async fn is_dir(&self, path: &Path) -> bool;

    /// Expands glob patterns relative to the root.
    ///
    /// Patterns starting with `!` exclude matches. The result is sorted,
    /// deduplicated and contains files only.
    async fn glob(&self, patterns: &[String]) -> Result<Vec<PathBuf>>;

    /// Reads a UTF-8 file.
    async fn read(&self, path: &Path) -> Result<String>;

    /// Reads a file as bytes.
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;

    /// Writes a file, creating parent directories.
    async fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Copies a file, creating parent directories.
    async fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Copies a directory tree; returns the number of files copied.
    async fn copy_dir(&self, from: &Path, to: &Path) -> Result<usize>;

    /// Deletes a file or directory tree. Missing paths are not an error.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Creates a directory and its parents.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Lists the direct children of a directory, sorted.
    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Splits patterns into includes and compiled `!` excludes.
///
/// # Errors
///
/// When an exclude pattern is not a valid glob.
pub(crate) fn split_patterns(patterns: &[String]) -> Result<(Vec<&str>, Vec<glob::Pattern>)> {
    let mut includes = Vec::new();
    let mut excludes = Vec::new();
    for pattern in patterns {
        if let Some(negated) = pattern.strip_prefix('!') {
            let compiled = glob::Pattern::new(negated)
                .with_context(|| format!("invalid glob `{pattern}`"))?;
            excludes.push(compiled);
        } else {
            includes.push(pattern.as_str());
        }
    }
    Ok((includes, excludes))
}

/// [`FileAccess`] on the local disk.
#[derive(Debug, Clone)]
pub struct LocalFileAccess {
    root: PathBuf,
}

impl LocalFileAccess {
    /// Creates a file port rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl FileAccess for LocalFileAccess {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(self.resolve(path)).await.unwrap_or(false)
    }

    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(self.resolve(path))
            .await
            .is_ok_and(|m| m.is_file())
    }

    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(self.resolve(path))
            .await
            .is_ok_and(|m| m.is_dir())
    }

    async fn glob(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
        let (includes, excludes) = split_patterns(patterns)?;
        let mut found = BTreeSet::new();
        for pattern in includes {
            let full = self.resolve(Path::new(pattern));
            let full = full.to_string_lossy();
            let paths = glob::glob(&full).with_context(|| format!("invalid glob `{pattern}`"))?;
            for entry in paths {
                let path = entry.with_context(|| format!("reading matches of `{pattern}`"))?;
                if !path.is_file() {
                    continue;
                }
                let rel = self.relative(&path);
                if excludes.iter().any(|ex| ex.matches_path(&rel)) {
                    continue;
                }
                found.insert(path);
            }
        }
        Ok(found.into_iter().collect())
    }

    async fn read(&self, path: &Path) -> Result<String> {
        let path = self.resolve(path);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }

    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let path = self.resolve(path);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let path = self.resolve(path);
        Self::ensure_parent(&path).await?;
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("writing {}", path.display()))
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let (from, to) = (self.resolve(from), self.resolve(to));
        Self::ensure_parent(&to).await?;
        tokio::fs::copy(&from, &to)
            .await
            .with_context(|| format!("copying {} to {}", from.display(), to.display()))?;
        Ok(())
    }

    async fn copy_dir(&self, from: &Path, to: &Path) -> Result<usize> {
        let (from, to) = (self.resolve(from), self.resolve(to));
        let mut pending = vec![(from, to)];
        let mut copied = 0;
        while let Some((src, dst)) = pending.pop() {
            tokio::fs::create_dir_all(&dst)
                .await
                .with_context(|| format!("creating {}", dst.display()))?;
            let mut entries = tokio::fs::read_dir(&src)
                .await
                .with_context(|| format!("reading {}", src.display()))?;
            while let Some(entry) = entries.next_entry().await? {
                let target = dst.join(entry.file_name());
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), target));
                } else {
                    tokio::fs::copy(entry.path(), &target).await?;
                    copied += 1;
                }
            }
        }
        Ok(copied)
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = self.resolve(path);
        let Ok(meta) = tokio::fs::metadata(&path).await else {
            return Ok(());
        };
        if meta.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        }
        .with_context(|| format!("deleting {}", path.display()))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let path = self.resolve(path);
        tokio::fs::create_dir_all(&path)
            .await
            .with_context(|| format!("creating {}", path.display()))
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let path = self.resolve(path);
        let mut entries = tokio::fs::read_dir(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            children.push(entry.path());
        }
        children.sort();
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture() -> (tempfile::TempDir, LocalFileAccess) {
        let dir = tempfile::tempdir().unwrap();
        let files = LocalFileAccess::new(dir.path());
        (dir, files)
    }

    #[tokio::test]
    async fn test_write_creates_parents_and_reads_back() {
        let (_dir, files) = fixture();
        files.write(Path::new("dist/a/b.txt"), "hello").await.unwrap();

        assert!(files.is_file(Path::new("dist/a/b.txt")).await);
        assert!(files.is_dir(Path::new("dist/a")).await);
        assert_eq!(files.read(Path::new("dist/a/b.txt")).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_glob_with_exclusions() {
        let (dir, files) = fixture();
        for name in ["src/a.ts", "src/b.ts", "src/b.test.ts", "src/style.scss"] {
            files.write(Path::new(name), "").await.unwrap();
        }

        let found = files
            .glob(&["src/*.ts".to_string(), "!src/*.test.ts".to_string()])
            .await
            .unwrap();

        assert_eq!(
            found,
            vec![dir.path().join("src/a.ts"), dir.path().join("src/b.ts")]
        );
    }

    #[tokio::test]
    async fn test_invalid_exclude_is_an_error() {
        let (_dir, files) = fixture();
        files.write(Path::new("dist/a.js"), "").await.unwrap();

        let err = files
            .glob(&["dist/*.js".to_string(), "!dist/[".to_string()])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid glob `!dist/[`"));
    }

    #[tokio::test]
    async fn test_copy_dir_and_delete() {
        let (_dir, files) = fixture();
        files.write(Path::new("dist/index.js"), "x").await.unwrap();
        files.write(Path::new("dist/lib/util.js"), "y").await.unwrap();

        let copied = files
            .copy_dir(Path::new("dist"), Path::new("snapshots/one"))
            .await
            .unwrap();
        assert_eq!(copied, 2);
        assert_eq!(files.read(Path::new("snapshots/one/lib/util.js")).await.unwrap(), "y");

        files.delete(Path::new("snapshots/one")).await.unwrap();
        assert!(!files.exists(Path::new("snapshots/one")).await);
        files.delete(Path::new("snapshots/missing")).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_dir_sorted() {
        let (dir, files) = fixture();
        for name in ["snap/b/x", "snap/a/x", "snap/c/x"] {
            files.write(Path::new(name), "").await.unwrap();
        }
        let listed = files.list_dir(Path::new("snap")).await.unwrap();
        assert_eq!(
            listed,
            vec![
                dir.path().join("snap/a"),
                dir.path().join("snap/b"),
                dir.path().join("snap/c")
            ]
        );
    }

    #[test]
    fn test_resolve_and_relative() {
        let files = LocalFileAccess::new("/work");
        assert_eq!(files.resolve(Path::new("src")), PathBuf::from("/work/src"));
        assert_eq!(files.resolve(Path::new("/abs")), PathBuf::from("/abs"));
        assert_eq!(files.relative(Path::new("/work/src/a.ts")), PathBuf::from("src/a.ts"));
        assert_eq!(files.relative(Path::new("/other")), PathBuf::from("/other"));
    }
}
