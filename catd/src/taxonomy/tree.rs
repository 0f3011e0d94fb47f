//! Canonical category tree
//!
//! Loaded once from a directory of newline-delimited path files
//! (`A > B > C` per line) and immutable afterwards. A JSON cache sidecar
//! may be written for fast restart; an unreadable cache is rebuilt.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use eyre::{Context, Result};
use tracing::{debug, info, warn};

/// Separator between levels of a taxonomy path
pub const PATH_SEPARATOR: &str = " > ";

/// Flattened taxonomy: every full path plus every prefix, in load order
#[derive(Debug, Clone, Default)]
pub struct TaxonomyTree {
    paths: Vec<String>,
}

impl TaxonomyTree {
    /// Build a tree from full-path lines, expanding prefixes
    ///
    /// `"A > B > C"` contributes `A`, `A > B`, and `A > B > C`.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut paths = Vec::new();

        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut prefix = String::new();
            for part in line.split(PATH_SEPARATOR) {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                if !prefix.is_empty() {
                    prefix.push_str(PATH_SEPARATOR);
                }
                prefix.push_str(part);

                if seen.insert(prefix.clone()) {
                    paths.push(prefix.clone());
                }
            }
        }

        Self { paths }
    }

    /// Load the tree from every `.txt` file in a directory
    ///
    /// Files are read in name order so the flattening is deterministic.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut files: Vec<_> = fs::read_dir(dir)
            .context(format!("Failed to read taxonomy directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        files.sort();

        let mut lines = Vec::new();
        for file in &files {
            let content =
                fs::read_to_string(file).context(format!("Failed to read taxonomy file {}", file.display()))?;
            lines.extend(content.lines().map(String::from));
        }

        let tree = Self::from_lines(lines);
        info!(
            dir = %dir.display(),
            files = files.len(),
            paths = tree.paths.len(),
            "taxonomy loaded"
        );
        Ok(tree)
    }

    /// Load via a JSON cache sidecar, rebuilding and rewriting it on miss
    pub fn load_cached(dir: &Path, cache_path: &Path) -> Result<Self> {
        if let Ok(content) = fs::read_to_string(cache_path) {
            match serde_json::from_str::<Vec<String>>(&content) {
                Ok(paths) => {
                    debug!(cache = %cache_path.display(), paths = paths.len(), "taxonomy cache hit");
                    return Ok(Self { paths });
                }
                Err(e) => warn!(cache = %cache_path.display(), error = %e, "taxonomy cache unreadable, rebuilding"),
            }
        }

        let tree = Self::load(dir)?;

        if let Some(parent) = cache_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string(&tree.paths) {
            Ok(serialized) => {
                if let Err(e) = fs::write(cache_path, serialized) {
                    warn!(cache = %cache_path.display(), error = %e, "failed to write taxonomy cache");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize taxonomy cache"),
        }

        Ok(tree)
    }

    /// All full paths, in flattening order
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Up to `n` paths for prompt context
    pub fn sample(&self, n: usize) -> &[String] {
        &self.paths[..self.paths.len().min(n)]
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
