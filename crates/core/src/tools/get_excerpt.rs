use async_trait::async_trait;
use serde_json::{json, Value};

use crate::security::validate_path;

use super::{Tool, ToolContext, ToolResult};

pub struct GetExcerptTool;

#[async_trait]
impl Tool for GetExcerptTool {
    fn name(&self) -> &str {
        "get_excerpt"
    }

    fn description(&self) -> &str {
        "Reads a bounded line range from a file under the repository root, with line numbers."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "minLength": 1 },
                "startLine": { "type": "integer", "minimum": 1 },
                "endLine": { "type": "integer", "minimum": 1 }
            },
            "required": ["path", "startLine", "endLine"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let Some(path) = args.get("path").and_then(Value::as_str) else {
            return ToolResult::failure("Validation failed: missing required field 'path'");
        };
        let Some(start_line) = args.get("startLine").and_then(Value::as_u64) else {
            return ToolResult::failure("Validation failed: missing required field 'startLine'");
        };
        let Some(end_line) = args.get("endLine").and_then(Value::as_u64) else {
            return ToolResult::failure("Validation failed: missing required field 'endLine'");
        };

        let resolved = match validate_path(&ctx.repo_root, path) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(format!("Handler error: path outside repository: {e}")),
        };

        let content = match std::fs::read_to_string(&resolved) {
            Ok(c) => c,
            Err(e) => return ToolResult::failure(format!("Handler error: failed to read '{path}': {e}")),
        };

        let lines: Vec<&str> = content.lines().collect();
        let line_count = lines.len().max(1);

        let start = (start_line as usize).clamp(1, line_count);
        let mut end = (end_line as usize).clamp(1, line_count);
        if end < start {
            end = start;
        }

        let excerpt = lines[start - 1..end.min(lines.len())]
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:6}| {}", start + i, line))
            .collect::<Vec<_>>()
            .join("\n");

        let summary = format!("File: {path} (lines {start}-{end} of {line_count})\n{excerpt}");
        let data = json!({ "path": path, "startLine": start, "endLine": end, "lineCount": line_count });
        ToolResult::success(data, summary)
    }
}
