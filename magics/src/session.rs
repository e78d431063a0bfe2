//! Session Management
//!
//! The interactive session the magics report to: a namespace for bound
//! variables and an output stream for messages and tables.

use std::collections::BTreeMap;
use std::io::Write;

use arrow::array::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use uuid::Uuid;

/// What the magics need from the host session
pub trait Shell {
    /// Bind a table to a variable name
    fn bind(&mut self, name: &str, table: RecordBatch);

    /// Render a table
    fn display(&mut self, table: &RecordBatch);

    /// Report a message
    fn print(&mut self, message: &str);

    /// Report an error trace
    fn print_error(&mut self, trace: &str) {
        self.print(trace);
    }
}

/// Session writing to any output stream
pub struct Session<W: Write> {
    /// Session ID
    pub id: String,

    /// Bound variables
    namespace: BTreeMap<String, RecordBatch>,

    out: W,
}

impl Session<std::io::Stdout> {
    /// Create a session printing to stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> Session<W> {
    /// Create a new session
    pub fn new(out: W) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            namespace: BTreeMap::new(),
            out,
        }
    }

    /// Get a bound variable
    pub fn get(&self, name: &str) -> Option<&RecordBatch> {
        self.namespace.get(name)
    }

    /// Names of bound variables, sorted
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.namespace.keys().map(String::as_str)
    }

    /// Output stream
    pub fn output(&self) -> &W {
        &self.out
    }

    fn write_line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            tracing::error!("Failed to write session output: {}", e);
        }
    }
}

impl<W: Write> Shell for Session<W> {
    fn bind(&mut self, name: &str, table: RecordBatch) {
        tracing::debug!("Binding {} rows to {}", table.num_rows(), name);
        self.namespace.insert(name.to_string(), table);
    }

    fn display(&mut self, table: &RecordBatch) {
        let rendered = render_table(table);
        self.write_line(&rendered);
    }

    fn print(&mut self, message: &str) {
        self.write_line(message);
    }

    fn print_error(&mut self, trace: &str) {
        self.write_line(trace);
        if let Err(e) = self.out.flush() {
            tracing::error!("Failed to flush session output: {}", e);
        }
    }
}

/// Render a table as text with a row count footer
pub fn render_table(table: &RecordBatch) -> String {
    match pretty_format_batches(std::slice::from_ref(table)) {
        Ok(rendered) => format!(
            "{}\n[{} rows x {} columns]",
            rendered,
            table.num_rows(),
            table.num_columns()
        ),
        Err(e) => {
            tracing::error!("Failed to render table: {}", e);
            format!("<table: {} rows x {} columns>", table.num_rows(), table.num_columns())
        }
    }
}
