use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{JourError, JourResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Write a sibling temp file, fsync it, rename it over the target.
    Atomic,
    /// Fail if the target already exists.
    CreateNew,
}

pub struct SafeFileWriter {
    create_parents: bool,
}

impl Default for SafeFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SafeFileWriter {
    pub fn new() -> Self {
        Self {
            create_parents: false,
        }
    }

    pub fn with_create_parents(mut self, create_parents: bool) -> Self {
        self.create_parents = create_parents;
        self
    }

    pub fn write(&self, path: &Path, content: &[u8], mode: WriteMode) -> JourResult<()> {
        if self.create_parents {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).map_err(|e| {
                        JourError::io(Some(parent.to_path_buf()), "create parent directories", e)
                    })?;
                }
            }
        }

        match mode {
            WriteMode::Atomic => write_atomic(path, content),
            WriteMode::CreateNew => {
                let mut file = OpenOptions::new()
                    .create_new(true)
                    .write(true)
                    .open(path)
                    .map_err(|e| JourError::io(Some(path.to_path_buf()), "create new file", e))?;
                file.write_all(content)
                    .and_then(|_| file.sync_all())
                    .map_err(|e| {
                        JourError::io(Some(path.to_path_buf()), "write newly created file", e)
                    })
            }
        }
    }

    pub fn write_text(&self, path: &Path, content: &str, mode: WriteMode) -> JourResult<()> {
        self.write(path, content.as_bytes(), mode)
    }
}

/// Path of the temporary sibling used while replacing `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "journal".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

/// Path of the pre-mutation backup copy of `path`.
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bup");
    PathBuf::from(name)
}

fn write_atomic(path: &Path, content: &[u8]) -> JourResult<()> {
    let temp_path = temp_path_for(path);

    let result = (|| -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        drop(file);
        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(&temp_path, metadata.permissions())?;
        }
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(JourError::io(
            Some(path.to_path_buf()),
            "replace journal file",
            e,
        ));
    }

    sync_parent_dir(path);
    Ok(())
}

/// fsync the directory so the rename itself is durable.
#[cfg(target_family = "unix")]
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(target_family = "unix"))]
fn sync_parent_dir(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_replaces_content_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("journal.md");
        fs::write(&target, "old\n").unwrap();

        SafeFileWriter::new()
            .write_text(&target, "new\n", WriteMode::Atomic)
            .unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new\n");
        assert!(!temp_path_for(&target).exists());
    }

    #[test]
    fn atomic_write_failure_keeps_previous_content() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("journal.md");
        fs::write(&target, "keep me\n").unwrap();
        // A directory in the temp file's place makes the write fail.
        fs::create_dir(temp_path_for(&target)).unwrap();

        let err = SafeFileWriter::new()
            .write_text(&target, "lost\n", WriteMode::Atomic)
            .unwrap_err();

        assert_eq!(err.error_code(), "E_IO");
        assert_eq!(fs::read_to_string(&target).unwrap(), "keep me\n");
    }

    #[cfg(unix)]
    #[test]
    fn atomic_write_keeps_target_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("journal.md");
        fs::write(&target, "old\n").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o640)).unwrap();

        SafeFileWriter::new()
            .write_text(&target, "new\n", WriteMode::Atomic)
            .unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn create_new_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("journal.md");
        let writer = SafeFileWriter::new().with_create_parents(true);

        writer
            .write_text(&target, "first\n", WriteMode::CreateNew)
            .unwrap();
        assert!(writer
            .write_text(&target, "second\n", WriteMode::CreateNew)
            .is_err());
        assert_eq!(fs::read_to_string(&target).unwrap(), "first\n");
    }

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path_for(Path::new("/tmp/Journal_of_Host.md")),
            PathBuf::from("/tmp/Journal_of_Host.md.bup")
        );
    }
}
