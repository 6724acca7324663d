use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Tool, ToolContext, ToolResult};

pub struct SearchChunksTool;

#[async_trait]
impl Tool for SearchChunksTool {
    fn name(&self) -> &str {
        "search_chunks"
    }

    fn description(&self) -> &str {
        "Full-text search over the indexed repository. Returns ranked file:line-range hits."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "minLength": 1 },
                "topK": { "type": "integer", "minimum": 1, "maximum": 50, "default": 10 }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            return ToolResult::failure("Validation failed: missing required field 'query'");
        };
        let top_k = args.get("topK").and_then(Value::as_u64).unwrap_or(10) as usize;

        let hits = match ctx.index.search(query, top_k) {
            Ok(hits) => hits,
            Err(e) => return ToolResult::failure(format!("Handler error: search failed: {e}")),
        };

        if hits.is_empty() {
            return ToolResult::success(
                json!({ "hits": [] }),
                format!("No results found for query '{query}'."),
            );
        }

        let summary = hits
            .iter()
            .enumerate()
            .map(|(i, h)| {
                format!(
                    "[{}] {}:{}-{} (score: {:.3})",
                    i + 1,
                    h.path,
                    h.start_line,
                    h.end_line,
                    h.score
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let data = json!({
            "hits": hits.iter().map(|h| json!({
                "path": h.path,
                "score": h.score,
                "snippet": h.snippet,
                "startLine": h.start_line,
                "endLine": h.end_line,
            })).collect::<Vec<_>>()
        });

        ToolResult::success(data, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repowiki_index::RepoIndex;
    use std::sync::Arc;

    #[tokio::test]
    async fn stop_character_query_returns_zero_hits_successfully() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("foo.rs"), "fn main() {}\n").unwrap();
        let index = RepoIndex::open_in_memory().unwrap();
        index.index_repository(tmp.path()).unwrap();
        let ctx = ToolContext {
            repo_root: tmp.path().to_path_buf(),
            index: Arc::new(index),
        };
        let result = SearchChunksTool.execute(json!({"query": "\" \""}), &ctx).await;
        assert!(result.is_success());
    }
}
