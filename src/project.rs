//! Project scanning for assistant context and bulk linting

use crate::lint::{DiagnosticsExtractor, DiagnosticsReport, ExtractionError};
use crate::util::is_javascript_path;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// A source file handed to the assistant as context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub name: String,
    /// Path relative to the scanned root
    pub path: String,
    pub content: String,
}

const IGNORED_DIRS: &[&str] = &[
    "node_modules", "target", "dist", "build", "out", "coverage", "vendor", "__pycache__",
];

const SOURCE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "mjs", "cjs", "ts", "tsx", "json", "css", "scss", "html", "md", "rs", "py",
    "go", "java", "rb", "php", "c", "h", "cpp", "hpp", "cs", "swift", "kt", "vue", "svelte",
    "yml", "yaml", "toml", "sh",
];

fn is_ignored(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_str().unwrap_or("");
    name.starts_with('.') || (entry.file_type().is_dir() && IGNORED_DIRS.contains(&name))
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Collect readable source files under `root`, sorted by path.
///
/// Hidden entries, dependency/build directories, binary or non-UTF-8 files
/// and anything larger than `max_file_bytes` are skipped.
pub fn analyze_project(root: &Path, max_file_bytes: u64) -> anyhow::Result<Vec<ProjectFile>> {
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_ignored(e))
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_source_file(path) {
            continue;
        }
        let too_large = entry
            .metadata()
            .map(|m| m.len() > max_file_bytes)
            .unwrap_or(true);
        if too_large {
            debug!(path = %path.display(), "skipping oversized file");
            continue;
        }
        let Ok(content) = std::fs::read_to_string(path) else {
            debug!(path = %path.display(), "skipping unreadable file");
            continue;
        };

        let rel_path = path.strip_prefix(root).unwrap_or(path);
        files.push(ProjectFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: rel_path.to_string_lossy().replace('\\', "/"),
            content,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Lint result for one project file
#[derive(Debug, Clone)]
pub struct FileLint {
    pub path: PathBuf,
    pub report: Result<DiagnosticsReport, ExtractionError>,
}

/// Lint every JavaScript-family file in parallel. Output keeps input order.
pub fn lint_project(files: &[ProjectFile], extractor: &DiagnosticsExtractor) -> Vec<FileLint> {
    files
        .par_iter()
        .filter(|file| is_javascript_path(Path::new(&file.path)))
        .map(|file| FileLint {
            path: PathBuf::from(&file.path),
            report: extractor.extract(&file.content, &file.path),
        })
        .collect()
}

/// Render files as prompt context, in the order given
pub fn render_context(files: &[ProjectFile], max_chars_per_file: usize) -> String {
    files
        .iter()
        .map(|file| {
            format!(
                "File name: {}\nFile path: {}\nFile content:\n{}\n",
                file.name,
                file.path,
                crate::util::truncate_content(&file.content, max_chars_per_file)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
