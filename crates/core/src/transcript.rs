//! The ordered conversation the loop builds up over one run. Grows
//! monotonically for the lifetime of the run and is discarded at the end —
//! there is no cross-invocation persistence.

use repowiki_provider::{Message, ToolInvocation};

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        self.messages.push(Message::system(text));
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    pub fn push_assistant_text(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant_text(text));
    }

    pub fn push_assistant_tool_calls(&mut self, calls: Vec<ToolInvocation>) {
        self.messages.push(Message::assistant_tool_calls(calls));
    }

    pub fn push_tool_result(&mut self, tool_call_id: impl Into<String>, output_summary: impl Into<String>) {
        self.messages.push(Message::tool_result(tool_call_id, output_summary));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_in_causal_order() {
        let mut t = Transcript::new();
        t.push_system("sys");
        t.push_user("question");
        t.push_assistant_tool_calls(vec![ToolInvocation {
            id: "call_1".into(),
            name: "get_excerpt".into(),
            arguments: serde_json::json!({}),
        }]);
        t.push_tool_result("call_1", "some output");
        assert_eq!(t.len(), 4);
        assert_eq!(t.messages()[3].tool_call_id.as_deref(), Some("call_1"));
    }
}
