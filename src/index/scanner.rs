//! Directory scanning.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// A file found by the scanner.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub mtime: SystemTime,
    pub size: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    pub recursive: bool,
    /// Accept only files with a (case-insensitive) `.txt` extension.
    pub only_txt: bool,
    /// Stop after this many files; 0 means no limit.
    pub max_files: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            only_txt: true,
            max_files: 0,
        }
    }
}

/// Walks a dataset directory and yields candidate files in a deterministic
/// order. A missing or non-directory root yields an empty list; the caller
/// cannot distinguish it from an empty dataset.
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    cfg: ScanConfig,
}

impl FileScanner {
    pub fn new(cfg: ScanConfig) -> Self {
        Self { cfg }
    }

    fn accept(&self, path: &Path) -> bool {
        if !self.cfg.only_txt {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
    }

    /// Scan `root` and return the matching files sorted ascending by path.
    /// The sort makes build fingerprints reproducible across worker counts.
    pub fn scan(&self, root: &Path) -> Vec<FileInfo> {
        let mut out = Vec::new();

        if !root.is_dir() {
            return out;
        }

        // The dataset is plain data, not a work tree: no hidden-file or
        // gitignore filtering.
        let mut walker = WalkBuilder::new(root);
        walker.standard_filters(false).follow_links(false);
        if !self.cfg.recursive {
            walker.max_depth(Some(1));
        }

        for entry in walker.build() {
            if self.cfg.max_files > 0 && out.len() >= self.cfg.max_files {
                break;
            }

            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if !self.accept(entry.path()) {
                continue;
            }

            // Unreadable metadata drops the file here; the build surfaces a
            // read failure later only if the file reappears.
            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue,
            };

            out.push(FileInfo {
                path: entry.path().to_path_buf(),
                mtime: meta.modified().unwrap_or(UNIX_EPOCH),
                size: meta.len(),
            });
        }

        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_root_yields_empty_list() {
        let scanner = FileScanner::default();
        assert!(scanner.scan(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn file_root_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "x").unwrap();
        assert!(FileScanner::default().scan(&file).is_empty());
    }

    #[test]
    fn filters_extension_case_insensitively_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("sub/a.TXT"), "a").unwrap();
        fs::write(dir.path().join("skip.md"), "no").unwrap();
        fs::write(dir.path().join("noext"), "no").unwrap();

        let files = FileScanner::default().scan(dir.path());
        let names: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(names, vec![dir.path().join("b.txt"), dir.path().join("sub/a.TXT")]);
    }

    #[test]
    fn non_recursive_scan_stays_at_top_level() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("top.txt"), "t").unwrap();
        fs::write(dir.path().join("sub/deep.txt"), "d").unwrap();

        let scanner = FileScanner::new(ScanConfig {
            recursive: false,
            ..ScanConfig::default()
        });
        let files = scanner.scan(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("top.txt"));
    }

    #[test]
    fn max_files_truncates() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{i}.txt")), "x").unwrap();
        }
        let scanner = FileScanner::new(ScanConfig {
            max_files: 3,
            ..ScanConfig::default()
        });
        assert_eq!(scanner.scan(dir.path()).len(), 3);
    }
}
