use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An import root on disk, laid out one directory per module.
pub struct Tree {
    root: TempDir,
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            root: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Writes `source` to `<root>/<module>/<file>`, creating the module
    /// directory as needed.
    pub fn file(&self, module: &str, file: &str, source: &str) -> PathBuf {
        let dir = self.root.path().join(module);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file);
        fs::write(&path, source).unwrap();
        path
    }

    pub fn module(&self, module: &str, source: &str) -> PathBuf {
        let file = format!("{}.svm", module.rsplit('/').next().unwrap());
        self.file(module, &file, source)
    }
}
