use crate::app::ignore::IgnorePaths;
use crate::app::models::NormalizedOptions;
use ignore::WalkBuilder;
use pathdiff::diff_paths;
use std::path::{Path, PathBuf};

/// Lists the project files that fall inside the fingerprint scope.
pub struct Scanner {
    root: PathBuf,
    ignore_paths: IgnorePaths,
}

impl Scanner {
    pub fn new(root: PathBuf, options: &NormalizedOptions) -> Self {
        Self {
            root,
            ignore_paths: options.ignore_paths.clone(),
        }
    }

    /// Walks the root, pruning whole subtrees via the directory matchers.
    /// Returns sorted, `/`-separated paths relative to the root.
    ///
    /// Symlinks are listed as entries of their own and never followed. Only
    /// the root's `.git` directory is skipped.
    pub fn scan(&self) -> Vec<String> {
        let mut files = Vec::new();

        let prune_root = self.root.clone();
        let prune_paths = self.ignore_paths.clone();
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                if entry.depth() == 1 && entry.file_name() == ".git" {
                    return false;
                }
                if !entry.file_type().is_some_and(|t| t.is_dir()) {
                    return true;
                }
                match relative_str(&prune_root, entry.path()) {
                    Some(relative) => !prune_paths.is_dir_ignored(&relative),
                    None => true,
                }
            })
            .build();

        for result in walker {
            match result {
                Ok(entry) => {
                    if !entry.file_type().is_some_and(is_listable) {
                        continue;
                    }
                    if let Some(relative) = self.process_entry(entry.path()) {
                        files.push(relative);
                    }
                }
                Err(err) => log::warn!("Error walking entry: {}", err),
            }
        }

        files.sort();
        files
    }

    fn process_entry(&self, path: &Path) -> Option<String> {
        let relative = relative_str(&self.root, path)?;
        if self.ignore_paths.is_ignored(&relative) {
            return None;
        }
        Some(relative)
    }
}

fn is_listable(file_type: std::fs::FileType) -> bool {
    file_type.is_file() || file_type.is_symlink()
}

fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let relative = diff_paths(path, root)?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}
