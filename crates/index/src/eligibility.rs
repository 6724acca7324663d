//! Which files the index walker will and won't touch.

use std::path::Path;

const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    ".git",
    ".next",
    ".nuxt",
    "coverage",
    "__pycache__",
    ".venv",
    "venv",
];

const INDEXABLE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "py", "rs", "go", "java", "c", "cpp", "h", "hpp", "md", "json",
    "yaml", "yml", "toml",
];

/// True if a directory entry (by name, not full path) should be skipped
/// while walking the repository tree.
pub fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

/// True if a file's extension is in the indexable set.
pub fn is_indexable_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| INDEXABLE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_dot_and_known_dirs() {
        assert!(is_skipped_dir(".git"));
        assert!(is_skipped_dir("node_modules"));
        assert!(is_skipped_dir(".venv"));
        assert!(!is_skipped_dir("src"));
    }

    #[test]
    fn indexable_extensions() {
        assert!(is_indexable_file(Path::new("foo.rs")));
        assert!(is_indexable_file(Path::new("foo.TS")));
        assert!(!is_indexable_file(Path::new("foo.exe")));
        assert!(!is_indexable_file(Path::new("foo")));
    }
}
