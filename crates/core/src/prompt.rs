//! System and control prompts fed to the model. Kept as plain string
//! builders rather than a templating engine — there is exactly one
//! template per call site and no user-authored prompts to sandbox.

use repowiki_config::BudgetConfig;
use repowiki_provider::ToolDefinition;

/// The prompt sent once, as the first message of the transcript. Enumerates
/// the tools, states the step/output budgets, and demands a `## Sources`
/// section with at least one citation before the model is allowed to stop.
pub fn default_system_prompt(tools: &[ToolDefinition], budgets: &BudgetConfig) -> String {
    let tool_list = tools
        .iter()
        .map(|t| format!("- `{}`: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a repository question-answering agent. You may call the following tools to gather evidence:\n\
         {tool_list}\n\n\
         Budgets for this run:\n\
         - at most {max_steps} tool-calling steps\n\
         - excerpts are capped at {max_excerpt_lines} lines; ask for another excerpt rather than a larger one\n\
         - each tool's output is truncated to {max_tool_output_chars} characters\n\n\
         Call tools one at a time and read their output before deciding the next step. Never invent a file \
         path, line number, or fact you have not actually read through a tool call.\n\n\
         When you have enough evidence, stop calling tools and answer. Your final message must:\n\
         1. Begin with the line `DONE`.\n\
         2. Answer the question in plain prose.\n\
         3. End with a `## Sources` section listing every file you relied on, one per line, as \
            `- \\`path/to/file\\`:startLine-endLine`, using only line ranges you actually read via `get_excerpt` \
            or saw in a `search_chunks` snippet. At least one citation is required.\n\n\
         Example final message:\n\
         DONE\n\
         The retry logic lives in the HTTP client and backs off exponentially on 5xx responses.\n\n\
         ## Sources\n\
         - `src/http/client.ts`:42-58\n",
        tool_list = tool_list,
        max_steps = budgets.max_steps,
        max_excerpt_lines = budgets.max_excerpt_lines,
        max_tool_output_chars = budgets.max_tool_output_chars,
    )
}

/// Fed back to the model after a verification failure, as a user-role
/// message, asking it to correct the specific citation problems found.
pub fn repair_prompt(errors: &[String]) -> String {
    let bullets = errors.iter().map(|e| format!("- {e}")).collect::<Vec<_>>().join("\n");
    format!(
        "Your answer's citations could not be verified:\n{bullets}\n\n\
         Re-read the relevant files if needed, then send a corrected final message. It must still begin \
         with `DONE` and end with a `## Sources` section whose citations point at real, in-range lines."
    )
}

/// Sent once the step budget is exhausted, asking the model to answer
/// immediately from whatever evidence the transcript already holds, rather
/// than requesting another tool call it will never get to run.
pub fn forced_termination_prompt() -> String {
    "You have used your entire tool-calling budget. Do not call any more tools. Answer now, using only the \
     evidence already gathered in this conversation. Your message must still begin with `DONE` and end with a \
     `## Sources` section citing the files and line ranges you actually read above."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_mentions_every_tool_and_budget() {
        let tools = vec![ToolDefinition {
            name: "search_chunks".into(),
            description: "Full-text search.".into(),
            parameters: serde_json::json!({}),
        }];
        let budgets = BudgetConfig { max_steps: 8, max_excerpt_lines: 120, max_tool_output_chars: 8000 };
        let prompt = default_system_prompt(&tools, &budgets);
        assert!(prompt.contains("search_chunks"));
        assert!(prompt.contains("8 tool-calling steps"));
        assert!(prompt.contains("## Sources"));
        assert!(prompt.contains("DONE"));
    }

    #[test]
    fn repair_prompt_lists_every_error() {
        let errors = vec!["file does not exist: 'x.ts'".to_string()];
        let prompt = repair_prompt(&errors);
        assert!(prompt.contains("file does not exist: 'x.ts'"));
    }
}
