//! Extracts citations from a `## Sources` markdown section and checks each
//! one against the filesystem under the repository-containment policy.

use std::path::Path;

use regex::Regex;
use serde::Serialize;

use crate::security::validate_path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub valid: bool,
    pub citations: Vec<Citation>,
    pub errors: Vec<String>,
}

fn citation_regex() -> Regex {
    Regex::new(r#"(?m)^[-*]\s*`([^`]+)`:(\d+)-(\d+)"#).expect("citation regex compiles")
}

/// Returns the body of the `## Sources` section (case-insensitive header,
/// optional trailing whitespace), from just after the header line through
/// the line before the next `##` header or end of text. `None` if no such
/// section exists.
fn extract_sources_section(markdown: &str) -> Option<String> {
    let lines: Vec<&str> = markdown.lines().collect();
    let start = lines
        .iter()
        .position(|l| l.trim().eq_ignore_ascii_case("## sources"))?;
    let end = lines[start + 1..]
        .iter()
        .position(|l| l.trim_start().starts_with("##"))
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());
    Some(lines[start + 1..end].join("\n"))
}

/// Structural-only parse: recovers citations from markdown without
/// touching the filesystem. Entries with `endLine < startLine` are
/// dropped rather than erroring, matching the forgiving round-trip law in
/// spec.md §8 (render(parse(x)) requires well-formed input to begin with).
pub fn parse_citations_markdown_only(markdown: &str) -> Vec<Citation> {
    let Some(section) = extract_sources_section(markdown) else {
        return Vec::new();
    };
    citation_regex()
        .captures_iter(&section)
        .filter_map(|caps| {
            let path = caps[1].to_string();
            let start: usize = caps[2].parse().ok()?;
            let end: usize = caps[3].parse().ok()?;
            if start < 1 || end < start {
                return None;
            }
            Some(Citation {
                path,
                start_line: start,
                end_line: end,
            })
        })
        .collect()
}

/// Renders citations back into a `## Sources` section. Together with
/// [`parse_citations_markdown_only`] this satisfies the round-trip law:
/// `parse(render(cs)) == cs` for any `cs` with `startLine <= endLine`, both
/// `>= 1`.
pub fn render_citations(citations: &[Citation]) -> String {
    let mut out = String::from("## Sources\n");
    for c in citations {
        out.push_str(&format!("- `{}`:{}-{}\n", c.path, c.start_line, c.end_line));
    }
    out
}

/// The canonical verifier: parses the `## Sources` section and checks every
/// structurally-valid citation against the filesystem under `repo_root`.
/// Always performs the filesystem check when given a repository root —
/// there is no markdown-only fast path here (see DESIGN.md's note on the
/// spec's "skipped for speed" divergence).
pub fn verify(markdown: &str, repo_root: &Path) -> VerifyReport {
    let Some(section) = extract_sources_section(markdown) else {
        return VerifyReport {
            valid: false,
            citations: Vec::new(),
            errors: vec!["Missing Sources section".to_string()],
        };
    };

    let mut citations = Vec::new();
    let mut errors = Vec::new();

    for caps in citation_regex().captures_iter(&section) {
        let path = caps[1].to_string();
        let start: usize = match caps[2].parse() {
            Ok(v) => v,
            Err(_) => {
                errors.push(format!("malformed start line in citation for '{path}'"));
                continue;
            }
        };
        let end: usize = match caps[3].parse() {
            Ok(v) => v,
            Err(_) => {
                errors.push(format!("malformed end line in citation for '{path}'"));
                continue;
            }
        };
        if start < 1 || end < start {
            errors.push(format!("invalid line range {start}-{end} for '{path}'"));
            continue;
        }

        let resolved = match validate_path(repo_root, &path) {
            Ok(p) => p,
            Err(_) => {
                errors.push(format!("outside repository: '{path}'"));
                continue;
            }
        };
        if !resolved.exists() {
            errors.push(format!("file does not exist: '{path}'"));
            continue;
        }
        let content = match std::fs::read_to_string(&resolved) {
            Ok(c) => c,
            Err(e) => {
                errors.push(format!("failed to read '{path}': {e}"));
                continue;
            }
        };
        let line_count = content.lines().count();
        if start > line_count || end > line_count {
            errors.push(format!(
                "line range {start}-{end} exceeds {line_count} lines in '{path}'"
            ));
            continue;
        }

        citations.push(Citation {
            path,
            start_line: start,
            end_line: end,
        });
    }

    let valid = errors.is_empty() && !citations.is_empty();
    VerifyReport {
        valid,
        citations,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo.ts"), "1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n").unwrap();
        dir
    }

    #[test]
    fn round_trip_law_holds_for_well_formed_citations() {
        let citations = vec![
            Citation { path: "foo.ts".into(), start_line: 1, end_line: 5 },
            Citation { path: "bar.rs".into(), start_line: 10, end_line: 10 },
        ];
        let rendered = render_citations(&citations);
        let parsed = parse_citations_markdown_only(&rendered);
        assert_eq!(parsed, citations);
    }

    #[test]
    fn missing_sources_section_fails() {
        let report = verify("just some text", Path::new("/tmp"));
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Missing Sources section".to_string()]);
    }

    #[test]
    fn valid_citation_on_disk_verifies() {
        let dir = fixture();
        let markdown = "Answer.\n\n## Sources\n- `foo.ts`:1-5\n";
        let report = verify(markdown, dir.path());
        assert!(report.valid);
        assert_eq!(report.citations, vec![Citation { path: "foo.ts".into(), start_line: 1, end_line: 5 }]);
    }

    #[test]
    fn path_escape_is_rejected_without_touching_filesystem() {
        let dir = fixture();
        let markdown = "## Sources\n- `../etc/passwd`:1-1\n";
        let report = verify(markdown, dir.path());
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("outside repository")));
    }

    #[test]
    fn nonexistent_file_is_rejected() {
        let dir = fixture();
        let markdown = "## Sources\n- `missing.ts`:1-2\n";
        let report = verify(markdown, dir.path());
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("does not exist")));
    }

    #[test]
    fn line_range_past_eof_is_rejected() {
        let dir = fixture();
        let markdown = "## Sources\n- `foo.ts`:1-500\n";
        let report = verify(markdown, dir.path());
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("exceeds")));
    }
}
