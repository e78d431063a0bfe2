//! Integration tests for notebook file conversion

use std::path::Path;

use notebook::{convert_notebook, Error};
use serde_json::{json, Value};

/// Helper to write a notebook fixture and return its path
fn write_notebook(dir: &Path, name: &str, notebook: &Value) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(notebook).unwrap()).unwrap();
    path
}

fn read_notebook(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn snowflake_notebook() -> Value {
    json!({
        "metadata": {"kernelspec": {"display_name": "Streamlit Notebook", "name": "streamlit"}},
        "nbformat_minor": 5,
        "nbformat": 4,
        "cells": [
            {"cell_type": "markdown", "id": "intro", "metadata": {"name": "intro"}, "source": "# Daily report"},
            {
                "cell_type": "code",
                "id": "q1",
                "metadata": {"language": "sql", "name": "orders", "collapsed": false},
                "source": "SELECT * FROM orders WHERE note = 'a;b';",
                "outputs": [],
                "execution_count": null
            },
            {
                "cell_type": "code",
                "id": "q2",
                "metadata": {"language": "sql"},
                "source": ["INSERT INTO t\n", "SELECT 1;"]
            },
            {"cell_type": "code", "id": "py", "metadata": {"language": "python"}, "source": "df = orders.to_pandas()"}
        ]
    })
}

#[test]
fn test_convert_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_notebook(dir.path(), "report.ipynb", &snowflake_notebook());
    let output = dir.path().join("report_converted.ipynb");

    let converted = convert_notebook(&input, &output).unwrap();
    assert_eq!(converted, 2);

    let result = read_notebook(&output);
    let cells = result["cells"].as_array().unwrap();
    assert_eq!(cells.len(), 10);

    let orders = &cells[7];
    assert_eq!(orders["id"], "q1");
    assert_eq!(orders["metadata"]["language"], "python");
    assert_eq!(orders["metadata"]["collapsed"], false);
    assert_eq!(orders["execution_count"], Value::Null);
    assert_eq!(
        orders["source"],
        "%%snowsql\nSELECT * FROM orders WHERE note = 'a;b';"
    );
    assert_eq!(
        cells[8]["source"],
        json!(["%%snowsql\n", "INSERT INTO t\n", "SELECT 1;"])
    );
    assert_eq!(cells[9]["source"], "df = orders.to_pandas()");
    assert_eq!(result["metadata"]["kernelspec"]["name"], "streamlit");
    assert_eq!(result["nbformat"], 4);
}

#[test]
fn test_input_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_notebook(dir.path(), "report.ipynb", &snowflake_notebook());
    let before = std::fs::read_to_string(&input).unwrap();

    convert_notebook(&input, &dir.path().join("out.ipynb")).unwrap();

    assert_eq!(std::fs::read_to_string(&input).unwrap(), before);
}

#[test]
fn test_output_is_two_space_indented() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_notebook(dir.path(), "report.ipynb", &snowflake_notebook());
    let output = dir.path().join("out.ipynb");

    convert_notebook(&input, &output).unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("{\n  \"metadata\": {"));
}

#[test]
fn test_converting_twice_changes_nothing_but_setup() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_notebook(dir.path(), "report.ipynb", &snowflake_notebook());
    let once = dir.path().join("once.ipynb");
    let twice = dir.path().join("twice.ipynb");

    convert_notebook(&input, &once).unwrap();
    assert_eq!(convert_notebook(&once, &twice).unwrap(), 0);

    let once = read_notebook(&once);
    let twice = read_notebook(&twice);
    let once_cells = once["cells"].as_array().unwrap();
    let twice_cells = twice["cells"].as_array().unwrap();
    assert_eq!(twice_cells[6..].to_vec(), once_cells.clone());
}

#[test]
fn test_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.ipynb");
    let output = dir.path().join("out.ipynb");

    let err = convert_notebook(&input, &output).unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(
        err.user_message(),
        format!("Error: Input file not found at {}", input.display())
    );
    assert!(!output.exists());
}

#[test]
fn test_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.ipynb");
    std::fs::write(&input, "{\"cells\": [").unwrap();
    let output = dir.path().join("out.ipynb");

    let err = convert_notebook(&input, &output).unwrap_err();

    assert_eq!(
        err.user_message(),
        format!("Error: Could not decode JSON from {}", input.display())
    );
    assert!(!output.exists());
}

#[test]
fn test_malformed_notebook() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_notebook(dir.path(), "list.ipynb", &json!([1, 2, 3]));
    let output = dir.path().join("out.ipynb");

    let err = convert_notebook(&input, &output).unwrap_err();

    assert!(matches!(err, Error::Malformed(_)));
    assert!(!output.exists());
}

#[test]
fn test_unwritable_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_notebook(dir.path(), "report.ipynb", &snowflake_notebook());
    let output = dir.path().join("no_such_dir").join("out.ipynb");

    let err = convert_notebook(&input, &output).unwrap_err();

    assert!(matches!(err, Error::Write { .. }));
    assert!(err
        .user_message()
        .starts_with(&format!("Error writing to output file {}: ", output.display())));
}
