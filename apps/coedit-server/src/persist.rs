//! Named document snapshots on disk. The live document stays in memory; this
//! only covers explicit save/load requests from the HTTP surface.
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::info;

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn save(&self, name: &str, text: &str) -> io::Result<()> {
        let path = self.path_for(name)?;
        fs::write(&path, text)?;
        info!("saved snapshot to {}", path.display());
        Ok(())
    }

    pub fn load(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.path_for(name)?)
    }

    pub fn list(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Snapshot names are bare file names; anything that could escape the
    /// store directory is rejected.
    fn path_for(&self, name: &str) -> io::Result<PathBuf> {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid snapshot name",
            ));
        }
        let mut path = self.dir.join(name);
        if path.extension().is_none() {
            path.set_extension("txt");
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(test: &str) -> SnapshotStore {
        let dir = std::env::temp_dir().join(format!("coedit-{}-{}", test, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        SnapshotStore::new(dir).unwrap()
    }

    #[test]
    fn save_load_roundtrip() {
        let store = store("roundtrip");
        store.save("memo", "shared text").unwrap();
        assert_eq!(store.load("memo").unwrap(), "shared text");
        assert_eq!(store.list().unwrap(), vec!["memo.txt".to_string()]);
    }

    #[test]
    fn traversal_names_are_rejected() {
        let store = store("traversal");
        assert!(store.save("../escape", "x").is_err());
        assert!(store.save("a/b", "x").is_err());
        assert!(store.save("  ", "x").is_err());
        assert!(store.load("..\\escape").is_err());
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let store = store("missing");
        assert!(store.load("nope").is_err());
    }
}
