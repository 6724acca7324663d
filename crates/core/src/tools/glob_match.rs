//! The glob dialect `list_files` and `graph_neighbors` match repository-
//! relative paths against: `**` matches anything including path
//! separators, `*` matches any run of characters except `/`, `?` matches
//! exactly one character except `/`.

#[derive(Debug, Clone, Copy)]
enum Token {
    Literal(char),
    AnySegment,
    AnyAll,
    AnyChar,
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(Token::AnyAll);
                } else {
                    tokens.push(Token::AnySegment);
                }
            }
            '?' => tokens.push(Token::AnyChar),
            other => tokens.push(Token::Literal(other)),
        }
    }
    tokens
}

pub fn glob_match(path: &str, pattern: &str) -> bool {
    let path_chars: Vec<char> = path.chars().collect();
    let tokens = tokenize(pattern);
    go(&path_chars, &tokens)
}

fn go(path: &[char], tokens: &[Token]) -> bool {
    match tokens.first() {
        None => path.is_empty(),
        Some(Token::Literal(c)) => !path.is_empty() && path[0] == *c && go(&path[1..], &tokens[1..]),
        Some(Token::AnyChar) => !path.is_empty() && path[0] != '/' && go(&path[1..], &tokens[1..]),
        Some(Token::AnySegment) => {
            go(path, &tokens[1..]) || (!path.is_empty() && path[0] != '/' && go(&path[1..], tokens))
        }
        Some(Token::AnyAll) => {
            // A `**/` run must also match zero path segments — e.g. `**/*.rs`
            // matching a root-level `keep.rs` — so try consuming the
            // following `/` along with an empty `**` before falling back to
            // the usual "match here, or consume one char and retry" recursion.
            if matches!(tokens.get(1), Some(Token::Literal('/'))) && go(path, &tokens[2..]) {
                return true;
            }
            go(path, &tokens[1..]) || (!path.is_empty() && go(&path[1..], tokens))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_star_stays_within_segment() {
        assert!(glob_match("src/main.rs", "src/*.rs"));
        assert!(!glob_match("src/nested/main.rs", "src/*.rs"));
    }

    #[test]
    fn double_star_crosses_segments() {
        assert!(glob_match("src/nested/main.rs", "src/**/*.rs"));
        assert!(glob_match("src/main.rs", "**/*.rs"));
    }

    #[test]
    fn double_star_prefix_also_matches_zero_segments() {
        assert!(glob_match("keep.rs", "**/*.rs"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(glob_match("a.rs", "?.rs"));
        assert!(!glob_match("ab.rs", "?.rs"));
    }

    #[test]
    fn literal_mismatch_fails() {
        assert!(!glob_match("foo.py", "*.rs"));
    }
}
