//! Persistent full-text index over a repository's eligible files.
//!
//! Search ranks through SQLite FTS5; the primary `files` table and the
//! `files_fts` virtual table are kept in sync purely by triggers (see
//! [`schema`]), so every read through `files_fts` reflects whatever was last
//! written to `files`.

mod eligibility;
mod schema;

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::UNIX_EPOCH;

use rusqlite::{params, Connection};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create index directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    pub path: String,
    pub content: String,
    pub last_modified_millis: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub path: String,
    pub score: f64,
    pub snippet: String,
    pub start_line: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub indexed: usize,
    pub skipped: usize,
}

/// Owns the SQLite connection backing the full-text index for one
/// repository. Opened once per agent run, closed exactly once on teardown.
pub struct RepoIndex {
    conn: Mutex<Connection>,
}

impl RepoIndex {
    /// Opens (creating if absent) the index database at `db_path`.
    pub fn open(db_path: &Path) -> IndexResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| IndexError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory index, used by tests and by short-lived ad-hoc searches.
    pub fn open_in_memory() -> IndexResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Walks `repo_root`, transactionally upserting every eligible file.
    /// Read errors increment `skipped` rather than aborting the walk.
    pub fn index_repository(&self, repo_root: &Path) -> IndexResult<IndexStats> {
        let mut stats = IndexStats::default();
        let mut files = Vec::new();
        walk(repo_root, repo_root, &mut files);

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for rel_path in &files {
            let full = repo_root.join(rel_path);
            let content = match std::fs::read_to_string(&full) {
                Ok(c) => c,
                Err(_) => {
                    stats.skipped += 1;
                    continue;
                }
            };
            let last_modified_millis = std::fs::metadata(&full)
                .and_then(|m| m.modified())
                .map(|t| {
                    t.duration_since(UNIX_EPOCH)
                        .map(|d| d.as_millis() as i64)
                        .unwrap_or(0)
                })
                .unwrap_or(0);

            let path_str = rel_path.to_string_lossy().to_string();
            tx.execute(
                "INSERT INTO files (path, content, last_modified_millis)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(path) DO UPDATE SET
                    content = excluded.content,
                    last_modified_millis = excluded.last_modified_millis",
                params![path_str, content, last_modified_millis],
            )?;
            stats.indexed += 1;
        }
        tx.commit()?;
        tracing::info!(indexed = stats.indexed, skipped = stats.skipped, "indexed repository");
        Ok(stats)
    }

    /// Full-text search, ranked by FTS5 relevance (lower raw bm25 is a
    /// better match; the returned `score` is the absolute value).
    pub fn search(&self, query: &str, top_k: usize) -> IndexResult<Vec<SearchHit>> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.trim_matches(|c| c == '"' || c == '\''))
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let match_expr = terms
            .iter()
            .map(|t| format!("\"{}\"", t.replace('"', "")))
            .collect::<Vec<_>>()
            .join(" OR ");

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT f.path, f.content, bm25(files_fts) as raw_score
             FROM files_fts
             JOIN files f ON f.file_id = files_fts.rowid
             WHERE files_fts MATCH ?1
             ORDER BY raw_score ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![match_expr, top_k as i64], |row| {
            let path: String = row.get(0)?;
            let content: String = row.get(1)?;
            let raw_score: f64 = row.get(2)?;
            Ok((path, content, raw_score))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (path, content, raw_score) = row?;
            let lines: Vec<&str> = content.lines().collect();
            let line_count = lines.len().max(1);
            let focus = focus_line(&lines, &terms);
            let start = focus.saturating_sub(5).max(1);
            let end = (focus + 15).min(line_count);
            let slice_start = start.saturating_sub(1).min(lines.len());
            let slice_end = end.min(lines.len());
            let snippet = lines[slice_start..slice_end].join("\n");
            hits.push(SearchHit {
                path,
                score: raw_score.abs(),
                snippet,
                start_line: start,
                end_line: end,
            });
        }
        Ok(hits)
    }

    /// Index-level directory/glob listing. Distinct from the `list_files`
    /// tool, which walks the live filesystem tree rather than the index.
    pub fn list_files(&self, directory_prefix: &str, glob_pattern: Option<&str>) -> IndexResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT path FROM files WHERE path LIKE ?1 ESCAPE '\\' ORDER BY path")?;
        let prefix_like = format!("{}%", escape_like(directory_prefix));
        let rows = stmt.query_map(params![prefix_like], |row| row.get::<_, String>(0))?;

        let like_pattern = glob_pattern.map(|g| g.replace('*', "%").replace('?', "_"));
        let mut out = Vec::new();
        for row in rows {
            let path = row?;
            if let Some(pattern) = &like_pattern {
                if matches_like(&path, pattern) {
                    out.push(path);
                }
            } else {
                out.push(path);
            }
        }
        Ok(out)
    }

    /// Returns the stored row for `path`, or `None` if it was never indexed.
    pub fn read_file(&self, path: &str) -> IndexResult<Option<IndexRow>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT path, content, last_modified_millis FROM files WHERE path = ?1",
                params![path],
                |row| {
                    Ok(IndexRow {
                        path: row.get(0)?,
                        content: row.get(1)?,
                        last_modified_millis: row.get(2)?,
                    })
                },
            )
            .ok();
        Ok(row)
    }

    /// Closes the underlying SQLite connection. Dropping `RepoIndex` also
    /// closes it; this exists so callers can observe close errors.
    pub fn close(self) -> IndexResult<()> {
        let conn = self.conn.into_inner().unwrap();
        conn.close().map_err(|(_, e)| IndexError::Sqlite(e))
    }
}

fn focus_line(lines: &[&str], terms: &[String]) -> usize {
    if lines.is_empty() {
        return 1;
    }
    let mut best_idx = 0usize;
    let mut best_count: i64 = -1;
    for (i, line) in lines.iter().enumerate() {
        let lower = line.to_lowercase();
        let count: i64 = terms.iter().map(|t| lower.matches(t.as_str()).count() as i64).sum();
        if count > best_count {
            best_count = count;
            best_idx = i;
        }
    }
    best_idx + 1
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn matches_like(text: &str, pattern: &str) -> bool {
    // Minimal SQL-LIKE matcher supporting `%` (any run) and `_` (any one char).
    fn go(t: &[u8], p: &[u8]) -> bool {
        match p.first() {
            None => t.is_empty(),
            Some(b'%') => go(t, &p[1..]) || (!t.is_empty() && go(&t[1..], p)),
            Some(b'_') => !t.is_empty() && go(&t[1..], &p[1..]),
            Some(c) => !t.is_empty() && t[0] == *c && go(&t[1..], &p[1..]),
        }
    }
    go(text.as_bytes(), pattern.as_bytes())
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if path.is_dir() {
            if !eligibility::is_skipped_dir(&name) {
                walk(root, &path, out);
            }
        } else if eligibility::is_indexable_file(&path) {
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_path_buf());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("foo.rs"),
            "fn main() {\n    println!(\"hello world\");\n}\n",
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules").join("skip.js"), "skip me").unwrap();
        std::fs::write(dir.path().join("bar.py"), "def hello():\n    return 'world'\n").unwrap();
        dir
    }

    #[test]
    fn index_repository_skips_ineligible_dirs() {
        let dir = fixture();
        let index = RepoIndex::open_in_memory().unwrap();
        let stats = index.index_repository(dir.path()).unwrap();
        assert_eq!(stats.indexed, 2);
        assert_eq!(stats.skipped, 0);
        assert!(index.read_file("node_modules/skip.js").unwrap().is_none());
    }

    #[test]
    fn search_finds_matching_file_with_snippet() {
        let dir = fixture();
        let index = RepoIndex::open_in_memory().unwrap();
        index.index_repository(dir.path()).unwrap();
        let hits = index.search("hello", 10).unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().any(|h| h.path == "foo.rs"));
    }

    #[test]
    fn search_with_only_stop_characters_returns_no_hits() {
        let dir = fixture();
        let index = RepoIndex::open_in_memory().unwrap();
        index.index_repository(dir.path()).unwrap();
        let hits = index.search("\" \" ''", 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn list_files_matches_prefix_and_glob() {
        let dir = fixture();
        let index = RepoIndex::open_in_memory().unwrap();
        index.index_repository(dir.path()).unwrap();
        let all = index.list_files("", None).unwrap();
        assert_eq!(all.len(), 2);
        let rs_only = index.list_files("", Some("*.rs")).unwrap();
        assert_eq!(rs_only, vec!["foo.rs".to_string()]);
    }

    #[test]
    fn reindex_upserts_rather_than_duplicates() {
        let dir = fixture();
        let index = RepoIndex::open_in_memory().unwrap();
        index.index_repository(dir.path()).unwrap();
        index.index_repository(dir.path()).unwrap();
        assert_eq!(index.list_files("", None).unwrap().len(), 2);
    }
}
