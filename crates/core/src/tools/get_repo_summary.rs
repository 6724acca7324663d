use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Tool, ToolContext, ToolResult};

pub struct GetRepoSummaryTool;

fn language_for(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "ts" | "tsx" => "TypeScript",
        "js" | "jsx" => "JavaScript",
        "py" => "Python",
        "rs" => "Rust",
        "go" => "Go",
        "java" => "Java",
        "c" => "C",
        "cpp" => "C++",
        "h" | "hpp" => "C/C++ Header",
        "md" => "Markdown",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        _ => return None,
    })
}

#[async_trait]
impl Tool for GetRepoSummaryTool {
    fn name(&self) -> &str {
        "get_repo_summary"
    }

    fn description(&self) -> &str {
        "Summarizes the repository: file/line counts per language and the top-level directory layout."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    async fn execute(&self, _args: Value, ctx: &ToolContext) -> ToolResult {
        let mut languages: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut total_files = 0usize;
        let mut total_lines = 0usize;

        walk(&ctx.repo_root, &ctx.repo_root, &mut |path| {
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                return;
            };
            let Some(lang) = language_for(&ext.to_lowercase()) else {
                return;
            };
            total_files += 1;
            *languages.entry(lang).or_insert(0) += 1;
            if let Ok(content) = std::fs::read_to_string(path) {
                total_lines += content.lines().count();
            }
        });

        let mut top_directories: Vec<String> = std::fs::read_dir(&ctx.repo_root)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| e.path().is_dir())
                    .filter_map(|e| {
                        let name = e.file_name().to_string_lossy().to_string();
                        if name.starts_with('.') || name == "node_modules" {
                            None
                        } else {
                            Some(name)
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        top_directories.sort();
        top_directories.truncate(10);

        let name = ctx
            .repo_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "repository".to_string());

        let description = std::fs::read_to_string(ctx.repo_root.join("README.md"))
            .ok()
            .and_then(|readme| readme.lines().map(str::trim).find(|l| !l.is_empty() && !l.starts_with('#')).map(str::to_string));

        let data = json!({
            "name": name,
            "totalFiles": total_files,
            "totalLines": total_lines,
            "languages": languages,
            "topDirectories": top_directories,
            "description": description,
        });

        let summary = format!(
            "{name}: {total_files} files, {total_lines} lines across {} languages. Top-level dirs: {}",
            languages.len(),
            top_directories.join(", ")
        );

        ToolResult::success(data, summary)
    }
}

fn walk(root: &Path, dir: &Path, visit: &mut impl FnMut(&Path)) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        if name.starts_with('.') || name == "node_modules" {
            continue;
        }
        if path.is_dir() {
            walk(root, &path, visit);
        } else {
            visit(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repowiki_index::RepoIndex;
    use std::sync::Arc;

    #[tokio::test]
    async fn counts_files_and_lines_per_language() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("foo.rs"), "a\nb\nc\n").unwrap();
        std::fs::write(tmp.path().join("bar.py"), "x\ny\n").unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        let ctx = ToolContext {
            repo_root: tmp.path().to_path_buf(),
            index: Arc::new(RepoIndex::open_in_memory().unwrap()),
        };
        let result = GetRepoSummaryTool.execute(json!({}), &ctx).await;
        match result {
            ToolResult::Success { data, .. } => {
                assert_eq!(data["totalFiles"], 2);
                assert_eq!(data["totalLines"], 5);
                assert!(data["topDirectories"].as_array().unwrap().iter().any(|d| d == "src"));
            }
            _ => panic!("expected success"),
        }
    }
}
