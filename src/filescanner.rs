use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

pub struct FileScanner {
    extensions: Vec<String>,
    exclude: PathBuf,
}

impl FileScanner {
    /// `exclude` is pruned from the walk together with everything below it.
    pub fn new(extensions: &[String], exclude: &Path) -> Self {
        FileScanner {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            exclude: PathBuf::from(exclude),
        }
    }

    pub fn scan(&self, root: &Path) -> Vec<PathBuf> {
        let mut found = vec![];
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || (!is_hidden(e) && e.path() != self.exclude));
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.is_media(entry.path()) {
                        found.push(entry.into_path());
                    }
                },
                Err(err) => warn!(error = %err, "skipping unreadable entry"),
            }
        }
        debug!(count = found.len(), root = %root.display(), "scan finished");
        found
    }

    fn is_media(&self, path: &Path) -> bool {
        match path.extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy().to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            },
            None => false,
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use crate::config::Config;

    #[test]
    fn test_scan() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("shows/s01")).unwrap();
        fs::create_dir_all(root.join("transcoded/shows")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        for p in [
            "a.mkv", "B.MP4", "notes.txt", "shows/s01/e01.mov", "shows/s01/e01.srt",
            "transcoded/a.hevc.mp4", "transcoded/shows/x.mp4", ".cache/c.mkv", "._a.mkv",
        ] {
            fs::write(root.join(p), b"x").unwrap();
        }

        let config = Config::default();
        let scanner = FileScanner::new(&config.extensions, &root.join("transcoded"));
        let mut found: Vec<PathBuf> = scanner.scan(root)
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        found.sort();

        assert_eq!(found, vec![
            PathBuf::from("B.MP4"),
            PathBuf::from("a.mkv"),
            PathBuf::from("shows/s01/e01.mov"),
        ]);
    }

    #[test]
    fn test_scan_empty() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = FileScanner::new(&Config::default().extensions, &dir.path().join("transcoded"));
        assert!(scanner.scan(dir.path()).is_empty());
    }
}
