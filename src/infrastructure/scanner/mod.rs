//! Filesystem scanner

use crate::domain::traits::Scanner;
use std::io;
use std::path::Path;

/// Lists directory entry names in sorted order, skipping hidden entries.
pub struct FsScanner;

impl Scanner for FsScanner {
    fn entries(&self, root: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}
