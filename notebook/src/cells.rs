//! Setup cells prepended to every converted notebook

use serde_json::{json, Value};
use uuid::Uuid;

/// Marker line routing a cell to the `%%snowsql` command
pub const SNOWSQL_MARKER: &str = "%%snowsql\n";

/// Language tag given to converted code cells
pub const PYTHON_LANGUAGE: &str = "python";

/// Language tag of cells to convert
pub const SQL_LANGUAGE: &str = "sql";

/// Cells that prepare the environment, authenticate and test the connection
///
/// Each call produces fresh cell ids.
pub fn setup_cells() -> Vec<Value> {
    vec![
        markdown_cell(
            "# Prepare python environment\nCreate a python virtual environment and install `ipykernel` package before running the notebook",
        ),
        code_cell(&["%%capture pip_install_output", "%pip install streamlit ipython"]),
        markdown_cell(
            "Install snowflake sql magics extension and configure it to connect to your Snowflake account",
        ),
        code_cell(&[
            "%reload_ext snowflake_sql_magics",
            "SNOWFLAKE_ACCOUNT = '<YOUR SNOWFLAKE ACCOUNT NAME>'",
            "SNOWFLAKE_USER = '<YOUR SNOWFLAKE USER NAME>'",
            "SNOWFLAKE_ROLE = '<SNOWFLAKE ROLE YOU WANT TO USE>'",
            "SNOWFLAKE_PRIVATE_KEY_PATH = '<PATH TO YOUR PRIVATE KEY FILE FOR KEY-PAIR AUTHENTICATION>'",
            "%snowauth --account $SNOWFLAKE_ACCOUNT --user $SNOWFLAKE_USER --role $SNOWFLAKE_ROLE --private_key_path $SNOWFLAKE_PRIVATE_KEY_PATH",
        ]),
        markdown_cell("## Test the connection"),
        code_cell(&[
            "%%snowsql test_connection",
            "SELECT CURRENT_USER(), CURRENT_ROLE(), CURRENT_VERSION();",
        ]),
    ]
}

fn markdown_cell(source: &str) -> Value {
    json!({
        "cell_type": "markdown",
        "id": Uuid::new_v4().to_string(),
        "source": source,
    })
}

fn code_cell(lines: &[&str]) -> Value {
    json!({
        "cell_type": "code",
        "id": Uuid::new_v4().to_string(),
        "metadata": {"language": PYTHON_LANGUAGE},
        "source": lines.join("\n"),
    })
}
