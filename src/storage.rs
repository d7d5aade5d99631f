use std::path::PathBuf;

use crate::eid::Eid;

/// Flat file store rooted at the base directory.
#[derive(Clone, Debug)]
pub struct BackendLocal {
    base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(base_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(BackendLocal { base_dir })
    }

    pub fn path(&self, ident: &str) -> PathBuf {
        self.base_dir.join(ident)
    }

    pub fn exists(&self, ident: &str) -> bool {
        self.path(ident).is_file()
    }

    pub fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path(ident))
    }

    /// Write through a uniquely named sibling, then rename over `ident`.
    pub fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let temp_path = self.base_dir.join(format!("{}-{ident}", Eid::new()));

        if let Err(err) = std::fs::write(&temp_path, data) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err);
        }

        std::fs::rename(&temp_path, self.path(ident))
    }
}
