use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use crate::security::validate_path;

use super::{Tool, ToolContext, ToolResult};

pub struct GraphNeighborsTool;

#[async_trait]
impl Tool for GraphNeighborsTool {
    fn name(&self) -> &str {
        "graph_neighbors"
    }

    fn description(&self) -> &str {
        "Shallow import-graph lookup: scans a file for 'import ... from \"X\"' statements and lists the resolved neighbors."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "nodeId": { "type": "string", "minLength": 1 },
                "depth": { "type": "integer", "minimum": 1, "maximum": 5, "default": 1 }
            },
            "required": ["nodeId"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let Some(node_id) = args.get("nodeId").and_then(Value::as_str) else {
            return ToolResult::failure("Validation failed: missing required field 'nodeId'");
        };
        // `depth` is accepted by the schema but this implementation only
        // ever returns direct neighbors (see DESIGN.md's open-question
        // decision for graph_neighbors).

        let resolved = match validate_path(&ctx.repo_root, node_id) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(format!("Handler error: path outside repository: {e}")),
        };
        let content = match std::fs::read_to_string(&resolved) {
            Ok(c) => c,
            Err(e) => return ToolResult::failure(format!("Handler error: node '{node_id}' not found: {e}")),
        };

        let import_re = Regex::new(r#"import\s+.*?\s+from\s+["']([^"']+)["']"#).unwrap();
        let node_dir = std::path::Path::new(node_id).parent().unwrap_or_else(|| std::path::Path::new(""));

        let mut neighbors = Vec::new();
        for line in content.lines() {
            let Some(caps) = import_re.captures(line) else {
                continue;
            };
            let target = &caps[1];
            if target.starts_with('.') {
                let joined = node_dir.join(target);
                let normalized = normalize(&joined);
                neighbors.push(json!({
                    "type": "file",
                    "path": normalized,
                    "relation": "imports",
                    "depth": 1
                }));
            } else {
                neighbors.push(json!({
                    "type": "module",
                    "name": target,
                    "relation": "imports",
                    "depth": 1
                }));
            }
        }

        let summary = if neighbors.is_empty() {
            format!("No import statements found in '{node_id}'.")
        } else {
            neighbors
                .iter()
                .map(|n| {
                    if n["type"] == "file" {
                        format!("file: {}", n["path"].as_str().unwrap_or_default())
                    } else {
                        format!("module: {}", n["name"].as_str().unwrap_or_default())
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        ToolResult::success(json!({ "neighbors": neighbors }), summary)
    }
}

fn normalize(path: &std::path::Path) -> String {
    use std::path::Component;
    let mut parts: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(s) => parts.push(s.to_str().unwrap_or("")),
            _ => {}
        }
    }
    parts.join("/")
}
