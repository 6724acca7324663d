//! Database schema for the repository index.

use rusqlite::Connection;

use crate::IndexError;

/// Bumped whenever the table/trigger shape changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

/// Initializes the index schema, dropping and recreating tables if an
/// older schema version is found on disk.
pub fn init_schema(conn: &Connection) -> Result<(), IndexError> {
    let existing_version: Option<u32> = conn
        .query_row(
            "SELECT CAST(value AS INTEGER) FROM schema_info WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .ok();

    match existing_version {
        Some(v) if v >= SCHEMA_VERSION => return Ok(()),
        Some(_) => {
            conn.execute_batch(
                r"
                DROP TABLE IF EXISTS files;
                DROP TABLE IF EXISTS files_fts;
                DROP TABLE IF EXISTS schema_info;
                ",
            )?;
        }
        None => {}
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            file_id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT NOT NULL UNIQUE,
            content TEXT NOT NULL,
            last_modified_millis INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_files_path ON files(path);

        -- External-content FTS5 table: the row data lives in `files`, the
        -- FTS side is kept in sync purely through the triggers below.
        CREATE VIRTUAL TABLE IF NOT EXISTS files_fts USING fts5(
            path,
            content,
            content='files',
            content_rowid='file_id',
            tokenize='porter unicode61'
        );

        CREATE TRIGGER IF NOT EXISTS files_ai AFTER INSERT ON files BEGIN
            INSERT INTO files_fts(rowid, path, content)
            VALUES (new.file_id, new.path, new.content);
        END;

        CREATE TRIGGER IF NOT EXISTS files_ad AFTER DELETE ON files BEGIN
            INSERT INTO files_fts(files_fts, rowid, path, content)
            VALUES ('delete', old.file_id, old.path, old.content);
        END;

        CREATE TRIGGER IF NOT EXISTS files_au AFTER UPDATE ON files BEGIN
            INSERT INTO files_fts(files_fts, rowid, path, content)
            VALUES ('delete', old.file_id, old.path, old.content);
            INSERT INTO files_fts(rowid, path, content)
            VALUES (new.file_id, new.path, new.content);
        END;

        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', '1');
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_expected_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'view')")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(Result::ok)
            .collect();

        assert!(tables.contains(&"files".to_string()));
        assert!(tables.contains(&"files_fts".to_string()));
    }
}
