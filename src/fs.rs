//! The disk-backed [`FileSystem`] collaborator.

use convergence::{Error, FileSystem, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Reads from and atomically rewrites real files.
pub struct RealFileSystem;

impl RealFileSystem {
    fn parent(path: &Path) -> &Path {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| Error::io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn realpath(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).map_err(|e| Error::io(path, e))
    }

    /// Write a sibling temporary file, copy the target's permissions onto
    /// it, then rename it over the target.
    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        let dir = Self::parent(path);
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        tmp.write_all(contents.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Error::io(tmp.path(), e))?;

        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(tmp.path(), metadata.permissions())
                .map_err(|e| Error::io(tmp.path(), e))?;
        }

        tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| Error::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convergence::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fstab");
        let fs = RealFileSystem;

        fs.write_atomic(&path, "one\n").unwrap();
        assert_eq!(fs.read_to_string(&path).unwrap(), "one\n");
        fs.write_atomic(&path, "two\n").unwrap();
        assert_eq!(fs.read_to_string(&path).unwrap(), "two\n");

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shadow");
        std::fs::write(&path, "root:*:19000::::::\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        RealFileSystem.write_atomic(&path, "root:!:19000::::::\n").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_append_adds_missing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fstab");
        std::fs::write(&path, "/dev/sda1 / ext4 defaults 0 1").unwrap();

        RealFileSystem
            .append(&path, "/dev/sdb1 /data ext4 defaults 0 2\n")
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "/dev/sda1 / ext4 defaults 0 1\n/dev/sdb1 /data ext4 defaults 0 2\n"
        );
    }

    #[test]
    fn test_read_optional_and_remove() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("group");
        let fs = RealFileSystem;
        assert_eq!(fs.read_optional(&path).unwrap(), None);

        fs.write_atomic(&path, "wheel:x:10:\n").unwrap();
        assert_eq!(fs.read_optional(&path).unwrap().as_deref(), Some("wheel:x:10:\n"));
        fs.remove(&path).unwrap();
        assert!(!fs.exists(&path));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = RealFileSystem
            .read_to_string(&dir.path().join("passwd"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("passwd"));
    }

    #[cfg(unix)]
    #[test]
    fn test_realpath_follows_symlinks() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("real");
        std::fs::create_dir(&target).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let fs = RealFileSystem;
        assert!(fs.is_dir(&link));
        assert_eq!(fs.realpath(&link).unwrap(), target.canonicalize().unwrap());
    }
}
