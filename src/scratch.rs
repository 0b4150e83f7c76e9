use std::path::{Path, PathBuf};

use tracing::debug;

/// A file in the scratch directory that is removed when the guard drops.
/// Removal failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    pub fn new(path: PathBuf) -> Self {
        ScratchFile { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarm the guard and hand the file over to the caller.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed scratch file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!(path = %self.path.display(), "could not remove scratch file: {}", e),
        }
    }
}

/// Last path segment of a URL or archive entry name, usable as a local file name.
pub fn file_name_of(name: &str) -> Option<&str> {
    let name = name.split(['?', '#']).next().unwrap_or(name);
    name.rsplit(['/', '\\'])
        .next()
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RP-1.zip");
        std::fs::write(&path, b"x").unwrap();
        {
            let guard = ScratchFile::new(path.clone());
            assert!(guard.path().exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn kept_file_survives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.xlsx");
        std::fs::write(&path, b"x").unwrap();
        let kept = ScratchFile::new(path.clone()).keep();
        assert_eq!(kept, path);
        assert!(path.exists());
    }

    #[test]
    fn guard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        drop(ScratchFile::new(dir.path().join("never-written")));
    }

    #[test]
    fn file_names() {
        assert_eq!(file_name_of("a/b/R4-1.docx"), Some("R4-1.docx"));
        assert_eq!(file_name_of("https://h/x/List.xlsx?v=2"), Some("List.xlsx"));
        assert_eq!(file_name_of("dir\\inner.zip"), Some("inner.zip"));
        assert_eq!(file_name_of("dir/"), None);
        assert_eq!(file_name_of("../"), None);
    }
}
