//! SQL Rewriter for cell-level directives
//!
//! This module rewrites directives embedded in a `%%snowsql` cell before the
//! cell is split into statements.
//!
//! ## Supported Rewrites
//!
//! ### FILE
//! Inlines the contents of a local file as a JSON literal:
//!
//! ```sql
//! -- Original
//! INSERT INTO events SELECT FILE('fixtures/event.json');
//!
//! -- Rewritten
//! INSERT INTO events SELECT PARSE_JSON($${"id": 1}$$);
//! ```
//!
//! A missing file becomes `/* FILE NOT FOUND: <path> */` and any other read
//! failure becomes `/* ERROR READING FILE <path>: <error> */`, so one bad
//! directive never aborts the cell.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use regex::{Captures, Regex};

/// Rewrite `FILE('path')` / `FILE("path")` directives
///
/// Relative paths are resolved against `base_dir`.
pub fn rewrite_file_directives(sql: &str, base_dir: &Path) -> String {
    let file_pattern = Regex::new(r#"FILE\((?:'(.*?)'|"(.*?)")\)"#).unwrap();

    if !file_pattern.is_match(sql) {
        return sql.to_string();
    }

    file_pattern
        .replace_all(sql, |cap: &Captures| {
            let path = cap
                .get(1)
                .or_else(|| cap.get(2))
                .map(|m| m.as_str().trim())
                .unwrap_or_default();
            inline_file(path, base_dir)
        })
        .into_owned()
}

/// Build the replacement text for a single directive
fn inline_file(path: &str, base_dir: &Path) -> String {
    let resolved = resolve_path(path, base_dir);

    match std::fs::read_to_string(&resolved) {
        Ok(content) => {
            tracing::debug!("Inlined {} ({} bytes)", resolved.display(), content.len());
            // Dollar-quoted constant, no escaping needed
            format!("PARSE_JSON($${}$$)", content)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!("FILE directive target not found: {}", path);
            format!("/* FILE NOT FOUND: {} */", path)
        }
        Err(e) => {
            tracing::warn!("FILE directive target unreadable: {}: {}", path, e);
            format!("/* ERROR READING FILE {}: {} */", path, e)
        }
    }
}

fn resolve_path(path: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
