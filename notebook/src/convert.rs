//! SQL cell conversion
//!
//! Rewrites code cells tagged `sql` into python cells that start with the
//! `%%snowsql` marker, and prepends the setup cells. Everything else in the
//! document is left as it was, key order included.

use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;

use crate::cells::{setup_cells, PYTHON_LANGUAGE, SNOWSQL_MARKER, SQL_LANGUAGE};
use crate::error::{Error, Result};

/// Convert a notebook file, writing the result to `output`
///
/// Returns the number of converted SQL cells. Nothing is written when the
/// input cannot be read or parsed.
pub fn convert_notebook(input: &Path, output: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(input).map_err(|source| match source.kind() {
        ErrorKind::NotFound => Error::NotFound(input.to_path_buf()),
        _ => Error::Read {
            path: input.to_path_buf(),
            source,
        },
    })?;

    let mut notebook: Value = serde_json::from_str(&text).map_err(|source| Error::Decode {
        path: input.to_path_buf(),
        source,
    })?;

    let converted = convert(&mut notebook).map_err(|e| match e {
        Error::Malformed(reason) => Error::Malformed(format!("{}: {}", input.display(), reason)),
        other => other,
    })?;

    let rendered = serde_json::to_string_pretty(&notebook)?;
    std::fs::write(output, rendered).map_err(|source| Error::Write {
        path: output.to_path_buf(),
        source,
    })?;

    tracing::info!(
        "Converted {} SQL cells from {} into {}",
        converted,
        input.display(),
        output.display()
    );
    Ok(converted)
}

/// Convert a parsed notebook in place
///
/// Returns the number of converted SQL cells.
pub fn convert(notebook: &mut Value) -> Result<usize> {
    let document = notebook
        .as_object_mut()
        .ok_or_else(|| Error::Malformed("top level is not a JSON object".to_string()))?;

    let cells = document
        .entry("cells")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| Error::Malformed("\"cells\" is not a list".to_string()))?;

    let mut prepared = setup_cells();
    prepared.append(cells);
    *cells = prepared;

    let mut converted = 0;
    for cell in cells.iter_mut() {
        if convert_cell(cell) {
            converted += 1;
        }
    }
    Ok(converted)
}

/// Convert one cell if it is a SQL code cell
fn convert_cell(cell: &mut Value) -> bool {
    if !is_sql_cell(cell) {
        return false;
    }

    let Some(fields) = cell.as_object_mut() else {
        return false;
    };

    if let Some(metadata) = fields.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.insert("language".to_string(), Value::from(PYTHON_LANGUAGE));
    }

    let source = fields.entry("source").or_insert(Value::Null);
    if source.is_null() {
        *source = Value::from(SNOWSQL_MARKER);
        return true;
    }

    match source {
        Value::Array(lines) => lines.insert(0, Value::from(SNOWSQL_MARKER)),
        Value::String(text) => text.insert_str(0, SNOWSQL_MARKER),
        other => {
            tracing::warn!("Leaving SQL cell with unexpected source type untouched: {}", other);
        }
    }
    true
}

fn is_sql_cell(cell: &Value) -> bool {
    cell.get("cell_type").and_then(Value::as_str) == Some("code")
        && cell
            .get("metadata")
            .and_then(|metadata| metadata.get("language"))
            .and_then(Value::as_str)
            == Some(SQL_LANGUAGE)
}
