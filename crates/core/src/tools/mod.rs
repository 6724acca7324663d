//! Tool descriptors, the registry that validates and dispatches them, and
//! the five built-in handlers.

mod get_excerpt;
mod get_repo_summary;
mod glob_match;
mod graph_neighbors;
mod list_files;
mod search_chunks;

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use jsonschema::Validator;
use repowiki_index::RepoIndex;
use repowiki_provider::ToolDefinition;
use serde_json::Value;

/// Shared, read-only context every handler executes against. Handlers are
/// stateless; everything they need to do their job lives here.
pub struct ToolContext {
    pub repo_root: PathBuf,
    pub index: Arc<RepoIndex>,
}

/// The outcome of one tool execution. `outputSummary`/`error` is the only
/// thing the LLM ever sees — it must be self-contained.
#[derive(Debug, Clone)]
pub enum ToolResult {
    Success { data: Value, output_summary: String },
    Failure { error: String },
}

impl ToolResult {
    pub fn success(data: Value, output_summary: impl Into<String>) -> Self {
        ToolResult::Success {
            data,
            output_summary: output_summary.into(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ToolResult::Failure { error: error.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    /// The text that gets folded into a `tool` transcript message.
    pub fn output_summary(&self) -> &str {
        match self {
            ToolResult::Success { output_summary, .. } => output_summary,
            ToolResult::Failure { error } => error,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema for the argument object. The single source of truth: the
    /// registry validates incoming arguments against this, and
    /// [`ToolRegistry::tool_schemas`] hands the very same value to the
    /// provider's function-calling format.
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult;
}

/// Holds an ordered name→descriptor mapping, validates arguments against
/// each tool's own schema before dispatch, and never lets a handler panic
/// escape as an exception — it always comes back as `ToolResult::Failure`.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn tool_schemas(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    /// Deserializes `arguments` (accepting either an already-parsed value or
    /// a JSON string), validates against the named tool's schema, and
    /// dispatches. Unknown tool names and schema violations are reported as
    /// `ToolResult::Failure`, never as an error from this function.
    pub async fn execute_call(&self, name: &str, arguments: Value, ctx: &ToolContext) -> ToolResult {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return ToolResult::failure(format!(
                "Unknown tool '{name}'. Available tools: {}",
                self.names().join(", ")
            ));
        };

        let arguments = match arguments {
            Value::String(s) => match serde_json::from_str::<Value>(&s) {
                Ok(v) => v,
                Err(e) => return ToolResult::failure(format!("Validation failed: invalid JSON arguments: {e}")),
            },
            other => other,
        };

        let schema = tool.parameters_schema();
        if let Ok(validator) = Validator::new(&schema) {
            let errors: Vec<String> = validator.iter_errors(&arguments).map(|e| e.to_string()).collect();
            if !errors.is_empty() {
                return ToolResult::failure(format!("Validation failed: {}", errors.join("; ")));
            }
        }

        let result = AssertUnwindSafe(tool.execute(arguments, ctx)).catch_unwind().await;
        match result {
            Ok(tool_result) => tool_result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "tool handler panicked".to_string());
                ToolResult::failure(format!("Handler error: {message}"))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the registry holding the five built-in tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(search_chunks::SearchChunksTool));
    registry.register(Arc::new(get_excerpt::GetExcerptTool));
    registry.register(Arc::new(list_files::ListFilesTool));
    registry.register(Arc::new(graph_neighbors::GraphNeighborsTool));
    registry.register(Arc::new(get_repo_summary::GetRepoSummaryTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use repowiki_index::RepoIndex;
    use std::sync::Arc as StdArc;

    fn ctx(root: PathBuf) -> ToolContext {
        ToolContext {
            repo_root: root,
            index: StdArc::new(RepoIndex::open_in_memory().unwrap()),
        }
    }

    #[tokio::test]
    async fn unknown_tool_lists_known_tools() {
        let registry = default_registry();
        let tmp = tempfile::tempdir().unwrap();
        let result = registry
            .execute_call("frobnicate", serde_json::json!({}), &ctx(tmp.path().to_path_buf()))
            .await;
        match result {
            ToolResult::Failure { error } => {
                assert!(error.contains("Unknown tool"));
                assert!(error.contains("get_excerpt"));
            }
            _ => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn invalid_arguments_are_rejected_before_dispatch() {
        let registry = default_registry();
        let tmp = tempfile::tempdir().unwrap();
        let result = registry
            .execute_call(
                "get_excerpt",
                serde_json::json!({"path": "foo.ts", "startLine": -1, "endLine": 3}),
                &ctx(tmp.path().to_path_buf()),
            )
            .await;
        match result {
            ToolResult::Failure { error } => assert!(error.contains("Validation failed")),
            _ => panic!("expected failure"),
        }
    }
}
