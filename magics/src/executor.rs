//! Statement batch execution
//!
//! Runs the statements of one cell in order on an open connection and turns
//! each cursor into a message or a table.

use arrow::array::RecordBatch;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::splitter::{split_statements, StatementKind};

/// One displayable result of a cell
#[derive(Debug, Clone)]
pub enum CellOutput {
    Message(String),
    Table(RecordBatch),
}

impl CellOutput {
    pub fn as_table(&self) -> Option<&RecordBatch> {
        match self {
            CellOutput::Table(table) => Some(table),
            CellOutput::Message(_) => None,
        }
    }
}

/// Split `sql` and execute every statement in order
///
/// The first failing statement aborts the batch; outputs of statements that
/// already ran are dropped with it.
pub fn execute_batch(connection: &mut dyn Connection, sql: &str) -> Result<Vec<CellOutput>> {
    let statements = split_statements(sql);
    tracing::debug!("Executing batch of {} statements", statements.len());

    let mut outputs = Vec::new();
    for statement in &statements {
        if let Some(output) = execute_statement(connection, statement)? {
            outputs.push(output);
        }
    }
    Ok(outputs)
}

/// Execute one statement
///
/// Returns `None` when the statement produced nothing worth showing: an
/// empty non-SHOW result, or a result that cannot be materialized.
pub fn execute_statement(
    connection: &mut dyn Connection,
    statement: &str,
) -> Result<Option<CellOutput>> {
    let mut cursor = connection.execute(statement)?;
    let kind = StatementKind::of(statement);

    if let Some(label) = kind.row_count_label() {
        let message = format!("{}: {}", label, cursor.row_count().unwrap_or(-1));
        cursor.fetch_all()?;
        return Ok(Some(CellOutput::Message(message)));
    }

    if cursor.description().is_none() {
        return Ok(Some(CellOutput::Message(
            "Statement executed successfully.".to_string(),
        )));
    }

    match cursor.fetch_table() {
        Ok(table) if table.num_rows() > 0 => Ok(Some(CellOutput::Table(table))),
        Ok(_) if kind == StatementKind::Show => Ok(Some(CellOutput::Message(
            "Show command executed successfully, but it did not produce any results to display."
                .to_string(),
        ))),
        Ok(_) => Ok(None),
        Err(Error::NotSupported(reason)) => {
            tracing::debug!("Result not materializable ({}), discarding rows", reason);
            cursor.fetch_all()?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
