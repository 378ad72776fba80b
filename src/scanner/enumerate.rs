//! Target enumeration: turns a root path into the ordered task list.

use crate::core::error::{Error, Result};
use crate::detection::WhitelistIndex;
use crate::scanner::context::RunContext;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files found below a root, after path whitelisting.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    /// Absolute paths to scan, in walk order
    pub tasks: Vec<PathBuf>,
    /// Files skipped because their relative path is whitelisted
    pub whitelisted_files: u64,
    /// Entries that could not be read during the walk
    pub skipped_entries: u64,
}

/// Walks a file or directory target.
pub struct FileEnumerator<'a> {
    whitelist: &'a WhitelistIndex,
    follow_symlinks: bool,
}

impl<'a> FileEnumerator<'a> {
    pub fn new(whitelist: &'a WhitelistIndex) -> Self {
        Self {
            whitelist,
            follow_symlinks: false,
        }
    }

    /// Follow symbolic links while walking.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Produce the ordered list of absolute file paths below `root`.
    ///
    /// A single-file root is returned as-is; path whitelisting only applies
    /// to files found by walking a directory.
    pub fn enumerate(&self, root: &Path, context: &RunContext) -> Result<Enumeration> {
        if !root.exists() {
            return Err(Error::PathNotFound(root.to_path_buf()));
        }

        let root = std::path::absolute(root).map_err(|e| Error::DirectoryAccess {
            path: root.to_path_buf(),
            source: e,
        })?;

        let mut enumeration = Enumeration::default();

        if root.is_file() {
            enumeration.tasks.push(root);
            return Ok(enumeration);
        }

        let check_paths = self.whitelist.has_path_rules();

        for entry in WalkDir::new(&root).follow_links(self.follow_symlinks) {
            if context.is_cancelled() {
                return Err(Error::ScanCancelled);
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::debug!("Skipping unreadable entry: {}", e);
                    enumeration.skipped_entries += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();

            if check_paths {
                let relative = path.strip_prefix(&root).unwrap_or(&path);
                if self.whitelist.is_path_whitelisted(relative) {
                    log::debug!("Whitelisted file: {}", path.display());
                    enumeration.whitelisted_files += 1;
                    continue;
                }
            }

            enumeration.tasks.push(path);
        }

        log::debug!(
            "{} files found for processing under {}",
            enumeration.tasks.len(),
            root.display()
        );

        Ok(enumeration)
    }
}
