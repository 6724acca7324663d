//! Turns a raw [`ChatResponse`] into one of the shapes the agent loop
//! actually has to react to.

use repowiki_provider::{ChatResponse, ToolInvocation};

#[derive(Debug, Clone)]
pub enum ClassifiedResponse {
    /// The model wants to call one or more tools, in emission order.
    ToolCalls(Vec<ToolInvocation>),
    /// The model considers the answer final. Carries the raw markdown,
    /// with any leading `DONE` marker stripped.
    Done(String),
    /// Neither of the above — no tool calls, no `DONE` marker, and no
    /// `## Sources` section to fall back on.
    Unexpected(String),
}

/// The spec names two distinct completion triggers: a leading `DONE`
/// marker, and — as a forgiving fallback — a body that already contains a
/// `## Sources` section with at least one backtick-quoted path. Both are
/// kept rather than picking one, so a model that forgets the marker but
/// still produces a well-formed cited answer isn't penalized.
pub fn classify(response: &ChatResponse) -> ClassifiedResponse {
    if !response.tool_invocations.is_empty() {
        return ClassifiedResponse::ToolCalls(response.tool_invocations.clone());
    }

    let text = response.assistant_text.clone().unwrap_or_default();
    let trimmed = text.trim_start();

    if trimmed.starts_with("DONE") {
        return ClassifiedResponse::Done(strip_done_marker(&text));
    }

    if text.to_lowercase().contains("## sources") && text.contains('`') {
        return ClassifiedResponse::Done(text);
    }

    ClassifiedResponse::Unexpected(text)
}

fn strip_done_marker(text: &str) -> String {
    let trimmed = text.trim_start();
    let rest = trimmed.strip_prefix("DONE").unwrap_or(trimmed);
    rest.trim_start_matches(':').trim_start().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use repowiki_provider::Usage;

    fn response(text: &str, calls: Vec<ToolInvocation>) -> ChatResponse {
        ChatResponse {
            assistant_text: Some(text.to_string()),
            tool_invocations: calls,
            usage: Some(Usage::default()),
            finish_reason: None,
        }
    }

    #[test]
    fn tool_calls_take_priority_over_text() {
        let calls = vec![ToolInvocation {
            id: "call_1".into(),
            name: "search_chunks".into(),
            arguments: serde_json::json!({"query": "foo"}),
        }];
        match classify(&response("ignored", calls.clone())) {
            ClassifiedResponse::ToolCalls(c) => assert_eq!(c, calls),
            _ => panic!("expected ToolCalls"),
        }
    }

    #[test]
    fn leading_done_marker_is_stripped() {
        match classify(&response("DONE\n\nThe answer.\n\n## Sources\n- `a.ts`:1-2\n", vec![])) {
            ClassifiedResponse::Done(text) => assert!(text.starts_with("The answer.")),
            _ => panic!("expected Done"),
        }
    }

    #[test]
    fn sources_section_without_marker_is_a_forgiving_done() {
        let text = "The answer.\n\n## Sources\n- `a.ts`:1-2\n";
        match classify(&response(text, vec![])) {
            ClassifiedResponse::Done(t) => assert_eq!(t, text),
            _ => panic!("expected Done"),
        }
    }

    #[test]
    fn plain_text_with_neither_is_unexpected() {
        match classify(&response("I am thinking about it.", vec![])) {
            ClassifiedResponse::Unexpected(_) => {}
            _ => panic!("expected Unexpected"),
        }
    }
}
