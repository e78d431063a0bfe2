//! Statement splitter
//!
//! Splits the text of a `%%snowsql` cell into individual statements on
//! semicolons that are not part of a quoted span.

/// Statement category derived from the leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
    Merge,
    Show,
    Other,
}

impl StatementKind {
    /// Classify a statement by its uppercased first whitespace-delimited token
    pub fn of(statement: &str) -> Self {
        let keyword = statement
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_uppercase();

        match keyword.as_str() {
            "INSERT" => StatementKind::Insert,
            "UPDATE" => StatementKind::Update,
            "DELETE" => StatementKind::Delete,
            "MERGE" => StatementKind::Merge,
            k if k.starts_with("SHOW") => StatementKind::Show,
            _ => StatementKind::Other,
        }
    }

    /// Label for the affected-row message of DML statements
    pub fn row_count_label(self) -> Option<&'static str> {
        match self {
            StatementKind::Insert => Some("Number of rows inserted"),
            StatementKind::Update => Some("Number of rows updated"),
            StatementKind::Delete => Some("Number of rows deleted"),
            StatementKind::Merge => Some("Number of rows affected"),
            _ => None,
        }
    }
}

/// Split a cell into trimmed, non-empty statements
///
/// A semicolon ends a statement only when the text after it closes every
/// `'...'` and `"..."` span it opens. Quotes have no escape sequences, so a
/// doubled `''` reads as two adjacent spans.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut start = 0;

    for (pos, ch) in sql.char_indices() {
        if ch == ';' && quotes_balanced(&sql[pos + 1..]) {
            push_statement(&mut statements, &sql[start..pos]);
            start = pos + 1;
        }
    }
    push_statement(&mut statements, &sql[start..]);

    statements
}

fn push_statement(statements: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        statements.push(piece.to_string());
    }
}

/// Whether `text` reads as unquoted characters and complete quoted spans
fn quotes_balanced(text: &str) -> bool {
    let mut open: Option<char> = None;
    for ch in text.chars() {
        match (open, ch) {
            (None, '\'' | '"') => open = Some(ch),
            (Some(q), c) if c == q => open = None,
            _ => {}
        }
    }
    open.is_none()
}
