//! The agent loop: drives the model through a bounded tool-calling
//! conversation and verifies every citation before handing back an answer.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use repowiki_config::BudgetConfig;
use repowiki_index::RepoIndex;
use repowiki_provider::{ChatRequest, LLMProvider, ToolInvocation};
use serde::Serialize;

use crate::classify::{self, ClassifiedResponse};
use crate::prompt;
use crate::steplog::{truncate_with_elision, StepLog, StepLogEntry};
use crate::tools::{ToolContext, ToolRegistry};
use crate::verify::{self, Citation};

#[derive(Debug, Clone, Copy)]
pub struct AgentConfig {
    pub max_steps: usize,
    pub max_excerpt_lines: usize,
    pub max_tool_output_chars: usize,
}

impl From<BudgetConfig> for AgentConfig {
    fn from(b: BudgetConfig) -> Self {
        Self {
            max_steps: b.max_steps,
            max_excerpt_lines: b.max_excerpt_lines,
            max_tool_output_chars: b.max_tool_output_chars,
        }
    }
}

/// The control states the loop moves through. `RunTools` carries the batch
/// of calls the model just emitted, dispatched serially in emission order.
/// There is no separate `Error` state: a provider-raised failure short-
/// circuits the whole loop via `?` before the state machine is ever
/// consulted again, and a step-budget failure still lands on `Done` (with
/// `verified=false` and `error` set) per the termination table.
#[derive(Debug, Clone)]
enum AgentState {
    AwaitModel,
    RunTools(Vec<ToolInvocation>),
    Verify,
    Repair,
    Done,
}

const NO_VERIFIED_SOURCES_MARKER: &str = "(No verified sources available)";
const MAX_STEPS_EXCEEDED: &str = "Max steps exceeded";

fn synthesize_fallback_answer(evidence: &[String]) -> String {
    let mut body = String::from(
        "Unable to produce a fully cited answer before the step budget was exhausted.",
    );
    if !evidence.is_empty() {
        body.push_str(" Evidence gathered so far:\n\n");
        for crumb in evidence {
            body.push_str("- ");
            body.push_str(crumb);
            body.push('\n');
        }
    }
    body.push_str(&format!("\n## Sources\n{NO_VERIFIED_SOURCES_MARKER}\n"));
    body
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentRunResult {
    pub answer_markdown: String,
    pub steps: StepLog,
    pub verified_citations: Vec<Citation>,
    pub verified: bool,
    pub total_millis: u64,
    pub error: Option<String>,
}

/// Runs one question to completion against `provider`, dispatching tool
/// calls through `registry` and verifying the final answer's citations
/// against `repo_root`. Bounded by `config.max_steps`; once exhausted the
/// model gets one forced-termination call asking it to answer from
/// whatever evidence it already gathered instead of requesting another
/// tool call it will never get to run.
pub async fn run_agent(
    repo_root: &Path,
    question: &str,
    provider: &dyn LLMProvider,
    registry: &ToolRegistry,
    index: Arc<RepoIndex>,
    config: AgentConfig,
) -> anyhow::Result<AgentRunResult> {
    let started = Instant::now();

    let budgets = BudgetConfig {
        max_steps: config.max_steps,
        max_excerpt_lines: config.max_excerpt_lines,
        max_tool_output_chars: config.max_tool_output_chars,
    };

    let mut transcript = crate::transcript::Transcript::new();
    transcript.push_system(prompt::default_system_prompt(&registry.tool_schemas(), &budgets));
    transcript.push_user(question);

    let mut steps = StepLog::new();
    let mut state = AgentState::AwaitModel;
    let mut step_no = 0usize;
    let mut forced = false;
    let mut final_answer: Option<String> = None;
    let mut verified = false;
    let mut verified_citations = Vec::new();
    let mut error = None;
    let mut gathered_evidence: Vec<String> = Vec::new();

    loop {
        match state {
            AgentState::AwaitModel => {
                step_no += 1;
                let step_started = Instant::now();

                if step_no > config.max_steps && !forced {
                    forced = true;
                    transcript.push_user(prompt::forced_termination_prompt());
                }

                let request = ChatRequest::new(transcript.messages().to_vec(), registry.tool_schemas());
                let response = provider.chat(request).await?;
                let elapsed = step_started.elapsed().as_millis() as u64;

                state = match classify::classify(&response) {
                    ClassifiedResponse::ToolCalls(calls) if !forced => {
                        transcript.push_assistant_tool_calls(calls.clone());
                        AgentState::RunTools(calls)
                    }
                    ClassifiedResponse::ToolCalls(_) => {
                        // Forced termination still asked for tools rather than
                        // answering. There is no budget left to run them, so
                        // synthesize a fallback from whatever evidence earlier
                        // tool calls already gathered.
                        let fallback = synthesize_fallback_answer(&gathered_evidence);
                        steps.push(done_entry(step_no, &fallback, elapsed, config.max_tool_output_chars));
                        final_answer = Some(fallback);
                        error = Some(MAX_STEPS_EXCEEDED.to_string());
                        AgentState::Done
                    }
                    ClassifiedResponse::Done(answer) => {
                        transcript.push_assistant_text(answer.clone());
                        steps.push(done_entry(step_no, &answer, elapsed, config.max_tool_output_chars));
                        final_answer = Some(answer);
                        AgentState::Verify
                    }
                    ClassifiedResponse::Unexpected(text) => {
                        if forced {
                            let fallback = synthesize_fallback_answer(&gathered_evidence);
                            steps.push(done_entry(step_no, &fallback, elapsed, config.max_tool_output_chars));
                            final_answer = Some(fallback);
                            error = Some(MAX_STEPS_EXCEEDED.to_string());
                            AgentState::Done
                        } else {
                            steps.push(StepLogEntry {
                                step_no,
                                tool_name: None,
                                tool_input_json: None,
                                output_summary_head: truncate_with_elision(&text, config.max_tool_output_chars),
                                elapsed_millis: elapsed,
                                is_done: false,
                                verifier_passed: None,
                                verifier_errors: None,
                            });
                            transcript.push_assistant_text(text);
                            transcript.push_user(prompt::repair_prompt(&[
                                "response contained neither a tool call nor a DONE-marked answer".to_string(),
                            ]));
                            AgentState::AwaitModel
                        }
                    }
                };
            }
            AgentState::RunTools(calls) => {
                for call in calls {
                    step_no += 1;
                    let step_started = Instant::now();
                    let ctx = ToolContext { repo_root: repo_root.to_path_buf(), index: index.clone() };
                    let result = registry.execute_call(&call.name, call.arguments.clone(), &ctx).await;
                    let elapsed = step_started.elapsed().as_millis() as u64;
                    let summary = truncate_with_elision(result.output_summary(), config.max_tool_output_chars);
                    if result.is_success() {
                        gathered_evidence.push(format!("{}: {}", call.name, result.output_summary()));
                    }
                    transcript.push_tool_result(call.id.clone(), summary.clone());
                    steps.push(StepLogEntry {
                        step_no,
                        tool_name: Some(call.name.clone()),
                        tool_input_json: Some(call.arguments.clone()),
                        output_summary_head: summary,
                        elapsed_millis: elapsed,
                        is_done: false,
                        verifier_passed: None,
                        verifier_errors: None,
                    });
                }
                state = AgentState::AwaitModel;
            }
            AgentState::Verify => {
                let answer = final_answer.clone().unwrap_or_default();
                let report = verify::verify(&answer, repo_root);
                steps.set_last_verifier_result(report.valid, report.errors.clone());

                if report.valid {
                    verified = true;
                    verified_citations = report.citations;
                    state = AgentState::Done;
                } else if forced {
                    error = Some(MAX_STEPS_EXCEEDED.to_string());
                    state = AgentState::Done;
                } else {
                    transcript.push_user(prompt::repair_prompt(&report.errors));
                    state = AgentState::Repair;
                }
            }
            AgentState::Repair => {
                state = AgentState::AwaitModel;
            }
            AgentState::Done => break,
        }
    }

    Ok(AgentRunResult {
        answer_markdown: final_answer.unwrap_or_default(),
        steps,
        verified_citations,
        verified,
        total_millis: started.elapsed().as_millis() as u64,
        error,
    })
}

fn done_entry(step_no: usize, text: &str, elapsed_millis: u64, max_chars: usize) -> StepLogEntry {
    StepLogEntry {
        step_no,
        tool_name: None,
        tool_input_json: None,
        output_summary_head: truncate_with_elision(text, max_chars),
        elapsed_millis,
        is_done: true,
        verifier_passed: None,
        verifier_errors: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::default_registry;
    use repowiki_provider::mock::ScriptedProvider;
    use repowiki_provider::{ChatResponse, Usage};
    use serde_json::json;

    fn fixture_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("client.ts"),
            (1..=60).map(|n| format!("line {n}\n")).collect::<String>(),
        )
        .unwrap();
        dir
    }

    fn config() -> AgentConfig {
        AgentConfig { max_steps: 8, max_excerpt_lines: 120, max_tool_output_chars: 8000 }
    }

    #[tokio::test]
    async fn happy_path_calls_a_tool_then_answers_with_verified_citations() {
        let repo = fixture_repo();
        let tool_call = ChatResponse {
            assistant_text: None,
            tool_invocations: vec![ToolInvocation {
                id: "call_1".into(),
                name: "get_excerpt".into(),
                arguments: json!({"path": "client.ts", "startLine": 1, "endLine": 5}),
            }],
            usage: Some(Usage::default()),
            finish_reason: Some("tool_calls".to_string()),
        };
        let done = ChatResponse {
            assistant_text: Some(
                "DONE\nThe file starts at line 1.\n\n## Sources\n- `client.ts`:1-5\n".to_string(),
            ),
            tool_invocations: vec![],
            usage: Some(Usage::default()),
            finish_reason: Some("stop".to_string()),
        };
        let provider = ScriptedProvider::new(vec![tool_call, done]);
        let registry = default_registry();
        let index = Arc::new(RepoIndex::open_in_memory().unwrap());

        let result = run_agent(repo.path(), "Where does the file start?", &provider, &registry, index, config())
            .await
            .unwrap();

        assert!(result.verified);
        assert_eq!(result.verified_citations, vec![Citation { path: "client.ts".into(), start_line: 1, end_line: 5 }]);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn repair_then_success_recovers_from_a_bad_citation() {
        let repo = fixture_repo();
        let bad = ChatResponse {
            assistant_text: Some("DONE\nAnswer.\n\n## Sources\n- `missing.ts`:1-2\n".to_string()),
            tool_invocations: vec![],
            usage: Some(Usage::default()),
            finish_reason: Some("stop".to_string()),
        };
        let fixed = ChatResponse {
            assistant_text: Some("DONE\nAnswer.\n\n## Sources\n- `client.ts`:1-2\n".to_string()),
            tool_invocations: vec![],
            usage: Some(Usage::default()),
            finish_reason: Some("stop".to_string()),
        };
        let provider = ScriptedProvider::new(vec![bad, fixed]);
        let registry = default_registry();
        let index = Arc::new(RepoIndex::open_in_memory().unwrap());

        let result = run_agent(repo.path(), "Anything?", &provider, &registry, index, config())
            .await
            .unwrap();

        assert!(result.verified);
        assert_eq!(result.steps.entries()[0].verifier_passed, Some(false));
    }

    #[tokio::test]
    async fn step_exhaustion_triggers_forced_termination() {
        let repo = fixture_repo();
        // With max_steps = 2: round 1 is a tool call (consumes the model step and
        // the tool-execution step), putting step_no at 3 by the time the loop
        // asks the model again — past budget, so the forced-termination prompt
        // is appended before this second (and final, scripted) response arrives.
        let tool_call = ChatResponse {
            assistant_text: None,
            tool_invocations: vec![ToolInvocation {
                id: "call_1".into(),
                name: "get_excerpt".into(),
                arguments: json!({"path": "client.ts", "startLine": 1, "endLine": 2}),
            }],
            usage: Some(Usage::default()),
            finish_reason: Some("tool_calls".to_string()),
        };
        let forced_answer = ChatResponse {
            assistant_text: Some("DONE\nFinal answer.\n\n## Sources\n- `client.ts`:1-2\n".to_string()),
            tool_invocations: vec![],
            usage: Some(Usage::default()),
            finish_reason: Some("stop".to_string()),
        };
        let provider = ScriptedProvider::new(vec![tool_call, forced_answer]);
        let registry = default_registry();
        let index = Arc::new(RepoIndex::open_in_memory().unwrap());

        let cfg = AgentConfig { max_steps: 2, max_excerpt_lines: 120, max_tool_output_chars: 8000 };
        let result = run_agent(repo.path(), "Anything?", &provider, &registry, index, cfg)
            .await
            .unwrap();

        assert!(result.verified);
        assert!(result.answer_markdown.contains("Final answer"));
    }

    #[tokio::test]
    async fn step_exhaustion_without_any_done_synthesizes_a_fallback_answer() {
        let repo = fixture_repo();
        let tool_call = ChatResponse {
            assistant_text: None,
            tool_invocations: vec![ToolInvocation {
                id: "call_1".into(),
                name: "get_excerpt".into(),
                arguments: json!({"path": "client.ts", "startLine": 1, "endLine": 2}),
            }],
            usage: Some(Usage::default()),
            finish_reason: Some("tool_calls".to_string()),
        };
        // The provider never emits DONE, even on the forced-termination call.
        let provider = ScriptedProvider::new(vec![tool_call.clone(), tool_call]);
        let registry = default_registry();
        let index = Arc::new(RepoIndex::open_in_memory().unwrap());

        let cfg = AgentConfig { max_steps: 1, max_excerpt_lines: 120, max_tool_output_chars: 8000 };
        let result = run_agent(repo.path(), "Anything?", &provider, &registry, index, cfg)
            .await
            .unwrap();

        assert!(!result.verified);
        assert_eq!(result.error.as_deref(), Some(MAX_STEPS_EXCEEDED));
        assert!(result.answer_markdown.contains("## Sources"));
        assert!(result.answer_markdown.contains(NO_VERIFIED_SOURCES_MARKER));
        assert!(result.answer_markdown.contains("get_excerpt"));
    }
}
