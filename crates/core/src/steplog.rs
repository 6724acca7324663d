//! Append-only record of what happened on each step of one agent run.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct StepLogEntry {
    pub step_no: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_input_json: Option<Value>,
    pub output_summary_head: String,
    pub elapsed_millis: u64,
    pub is_done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_passed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_errors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StepLog(Vec<StepLogEntry>);

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: StepLogEntry) {
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[StepLogEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Attaches a verifier outcome to the most recently pushed entry.
    /// Verification always happens one step after the answer it judges, so
    /// the result is folded back onto that earlier entry rather than given
    /// its own step number.
    pub fn set_last_verifier_result(&mut self, passed: bool, errors: Vec<String>) {
        if let Some(last) = self.0.last_mut() {
            last.verifier_passed = Some(passed);
            last.verifier_errors = if errors.is_empty() { None } else { Some(errors) };
        }
    }
}

/// Truncates `text` to `max_chars` via head/tail elision, preserving
/// roughly the first and last half and noting how much was dropped.
pub fn truncate_with_elision(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let marker_budget = 40; // rough allowance for the "... N chars truncated ..." marker itself
    let keep = max_chars.saturating_sub(marker_budget).max(2);
    let head_len = keep / 2;
    let tail_len = keep - head_len;
    let truncated = total - head_len - tail_len;

    let head: String = chars[..head_len].iter().collect();
    let tail: String = chars[total - tail_len..].iter().collect();
    format!("{head}\n… {truncated} chars truncated …\n{tail}")
}
