use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::glob_match::glob_match;
use super::{Tool, ToolContext, ToolResult};

pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "Lists repository-relative file paths matching a glob pattern (supports ** * ?)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "glob": { "type": "string", "minLength": 1 },
                "limit": { "type": "integer", "minimum": 1, "maximum": 1000, "default": 100 }
            },
            "required": ["glob"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let Some(glob) = args.get("glob").and_then(Value::as_str) else {
            return ToolResult::failure("Validation failed: missing required field 'glob'");
        };
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(100) as usize;

        let mut matches = Vec::new();
        walk(&ctx.repo_root, &ctx.repo_root, glob, limit, &mut matches);

        let shown: Vec<&String> = matches.iter().take(20).collect();
        let mut summary = shown
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if matches.len() > 20 {
            summary.push_str(&format!("\n… and {} more", matches.len() - 20));
        }
        if matches.is_empty() {
            summary = format!("No files matched glob '{glob}'.");
        }

        ToolResult::success(json!({ "paths": matches }), summary)
    }
}

fn walk(root: &Path, dir: &Path, glob: &str, limit: usize, out: &mut Vec<String>) {
    if out.len() >= limit {
        return;
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };
    let mut entries: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    entries.sort();

    for path in entries {
        if out.len() >= limit {
            return;
        }
        let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        if name.starts_with('.') || name == "node_modules" {
            continue;
        }
        if path.is_dir() {
            walk(root, &path, glob, limit, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            if glob_match(&rel_str, glob) {
                out.push(rel_str);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repowiki_index::RepoIndex;
    use std::sync::Arc;

    #[tokio::test]
    async fn limit_one_returns_at_most_one_entry() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.rs"), "").unwrap();
        std::fs::write(tmp.path().join("b.rs"), "").unwrap();
        let ctx = ToolContext {
            repo_root: tmp.path().to_path_buf(),
            index: Arc::new(RepoIndex::open_in_memory().unwrap()),
        };
        let result = ListFilesTool
            .execute(json!({"glob": "*.rs", "limit": 1}), &ctx)
            .await;
        match result {
            ToolResult::Success { data, .. } => assert_eq!(data["paths"].as_array().unwrap().len(), 1),
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn skips_hidden_and_node_modules() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("node_modules")).unwrap();
        std::fs::write(tmp.path().join("node_modules").join("x.rs"), "").unwrap();
        std::fs::write(tmp.path().join("keep.rs"), "").unwrap();
        let ctx = ToolContext {
            repo_root: tmp.path().to_path_buf(),
            index: Arc::new(RepoIndex::open_in_memory().unwrap()),
        };
        let result = ListFilesTool
            .execute(json!({"glob": "**/*.rs", "limit": 100}), &ctx)
            .await;
        match result {
            ToolResult::Success { data, .. } => {
                let paths: Vec<String> = data["paths"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|v| v.as_str().unwrap().to_string())
                    .collect();
                assert_eq!(paths, vec!["keep.rs".to_string()]);
            }
            _ => panic!("expected success"),
        }
    }
}
