//! Discovery of the source files a run works on.
//!
//! Directory names listed as exclusions are skipped wherever they appear in the tree, hidden entries
//! are skipped, and only files with one of the requested extensions are kept.

use std::path::{Path, PathBuf};

use ignore::{overrides::OverrideBuilder, WalkBuilder};
use thiserror::Error;
use tracing::warn;

pub trait Search {
    fn search(self) -> Result<Vec<PathBuf>, SearcherError>;
}

pub enum Target<'a> {
    Path(&'a Path),
}

#[derive(Error, Debug)]
pub enum SearcherError {
    #[error("Target does not exist: {0}")]
    TargetNotFound(PathBuf),
    #[error("Invalid exclude pattern: {0}")]
    InvalidPattern(#[from] ignore::Error),
}

pub struct FileSearcher<'a> {
    target: Target<'a>,
    extensions: Vec<String>,
    exclude: Vec<String>,
}

impl<'a> FileSearcher<'a> {
    pub fn new(target: Target<'a>, extensions: &[String], exclude: &[String]) -> Self {
        let extensions = extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_owned())
            .filter(|ext| !ext.is_empty())
            .collect();
        let exclude = exclude
            .iter()
            .map(|dir| dir.trim().trim_matches('/').to_owned())
            .filter(|dir| !dir.is_empty())
            .collect();
        Self {
            target,
            extensions,
            exclude,
        }
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| wanted == ext))
    }
}

impl Search for FileSearcher<'_> {
    fn search(self) -> Result<Vec<PathBuf>, SearcherError> {
        let Target::Path(root) = self.target;
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }
        if !root.is_dir() {
            return Err(SearcherError::TargetNotFound(root.to_path_buf()));
        }

        let mut overrides = OverrideBuilder::new(root);
        for dir in &self.exclude {
            overrides.add(&format!("!**/{dir}"))?;
            overrides.add(&format!("!**/{dir}/**"))?;
        }

        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(true)
            .overrides(overrides.build()?)
            .build();

        let mut files = vec![];
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if self.has_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        files.dedup();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{FileSearcher, Search, SearcherError, Target};

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "console.log(1);\n").unwrap();
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn search_filters_extensions_and_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "src/app.js",
            "src/view.tsx",
            "src/styles.css",
            "src/nested/dist/bundle.js",
            "node_modules/pkg/index.js",
            "dist/app.js",
            ".cache/tmp.js",
            "README.md",
        ] {
            touch(root, rel);
        }

        let searcher = FileSearcher::new(
            Target::Path(root),
            &list(&["js", ".tsx"]),
            &list(&["node_modules", "dist/"]),
        );
        let files: Vec<_> = searcher
            .search()
            .unwrap()
            .into_iter()
            .map(|path| path.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            files,
            vec![Path::new("src/app.js"), Path::new("src/view.tsx")]
        );
    }

    #[test]
    fn search_single_file_target() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "one.mjs");
        let file = dir.path().join("one.mjs");

        let files = FileSearcher::new(Target::Path(&file), &list(&["js"]), &[])
            .search()
            .unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn search_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let err = FileSearcher::new(Target::Path(&missing), &list(&["js"]), &[])
            .search()
            .unwrap_err();
        assert!(matches!(err, SearcherError::TargetNotFound(_)));
    }
}
