//! Test utilities for the magics
//!
//! A scripted connector whose connections answer statements from a fixed
//! table of replies, and a shell that records everything reported to it.

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use arrow::array::{Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};

use crate::connection::{
    AuthArgs, ColumnDescription, Connection, ConnectionParams, Connector, Cursor,
};
use crate::error::{Error, Result};
use crate::session::Shell;

/// Scripted answer to one statement
#[derive(Clone)]
pub enum Reply {
    /// Result set with rows
    Rows(RecordBatch),
    /// Result set without rows
    Empty,
    /// DML with an affected-row count
    Dml(i64),
    /// Result set that cannot be materialized
    Unsupported,
    /// Execution error
    Fail(String),
}

/// What the scripted connections saw
#[derive(Debug, Default)]
pub struct Log {
    pub connects: usize,
    pub executed: Vec<String>,
    pub discarded: usize,
    pub closed: bool,
    pub dropped: usize,
    pub last_params: Option<ConnectionParams>,
}

/// Connector answering from a reply table
///
/// Statements without a scripted reply succeed without a result set.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    replies: HashMap<String, Reply>,
    connect_error: Option<String>,
    log: Rc<RefCell<Log>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, statement: &str, reply: Reply) -> Self {
        self.replies.insert(statement.to_string(), reply);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.connect_error = Some(message.to_string());
        self
    }

    pub fn log(&self) -> Ref<'_, Log> {
        self.log.borrow()
    }

    /// Mark the current connection closed
    pub fn close_connection(&self) {
        self.log.borrow_mut().closed = true;
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Connection>> {
        if let Some(message) = &self.connect_error {
            return Err(Error::Api {
                code: "390144".to_string(),
                message: message.clone(),
                sql_state: "08001".to_string(),
            });
        }

        let mut log = self.log.borrow_mut();
        log.connects += 1;
        log.closed = false;
        log.last_params = Some(params.clone());

        Ok(Box::new(ScriptedConnection {
            replies: self.replies.clone(),
            log: Rc::clone(&self.log),
        }))
    }
}

struct ScriptedConnection {
    replies: HashMap<String, Reply>,
    log: Rc<RefCell<Log>>,
}

impl Connection for ScriptedConnection {
    fn is_closed(&self) -> bool {
        self.log.borrow().closed
    }

    fn execute(&mut self, statement: &str) -> Result<Box<dyn Cursor>> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        self.log.borrow_mut().executed.push(statement.to_string());

        match self.replies.get(statement) {
            Some(Reply::Fail(message)) => Err(Error::Api {
                code: "001003".to_string(),
                message: message.clone(),
                sql_state: "42000".to_string(),
            }),
            reply => Ok(Box::new(ScriptedCursor {
                reply: reply.cloned(),
                columns: vec![ColumnDescription {
                    name: "ID".to_string(),
                    r#type: "FIXED".to_string(),
                    scale: Some(0),
                    nullable: true,
                }],
                log: Rc::clone(&self.log),
            })),
        }
    }
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.log.borrow_mut().dropped += 1;
    }
}

struct ScriptedCursor {
    reply: Option<Reply>,
    columns: Vec<ColumnDescription>,
    log: Rc<RefCell<Log>>,
}

impl Cursor for ScriptedCursor {
    fn row_count(&self) -> Option<i64> {
        match &self.reply {
            Some(Reply::Dml(count)) => Some(*count),
            _ => None,
        }
    }

    fn description(&self) -> Option<&[ColumnDescription]> {
        match &self.reply {
            Some(Reply::Rows(_) | Reply::Empty | Reply::Unsupported) => Some(&self.columns),
            _ => None,
        }
    }

    fn fetch_table(&mut self) -> Result<RecordBatch> {
        match &self.reply {
            Some(Reply::Rows(table)) => Ok(table.clone()),
            Some(Reply::Unsupported) => Err(Error::NotSupported("scripted".to_string())),
            _ => Ok(RecordBatch::new_empty(Arc::new(Schema::new(vec![Field::new(
                "ID",
                DataType::Int64,
                true,
            )])))),
        }
    }

    fn fetch_all(&mut self) -> Result<()> {
        self.log.borrow_mut().discarded += 1;
        Ok(())
    }
}

/// Event reported to a [`RecordingShell`]
#[derive(Debug, Clone)]
pub enum Event {
    Print(String),
    Error(String),
    Display(RecordBatch),
    Bind(String, RecordBatch),
}

/// Shell that records every call
#[derive(Default)]
pub struct RecordingShell {
    pub events: Vec<Event>,
}

impl RecordingShell {
    pub fn messages(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Print(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Error(trace) => Some(trace.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn bound(&self) -> Vec<(&str, &RecordBatch)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Bind(name, table) => Some((name.as_str(), table)),
                _ => None,
            })
            .collect()
    }

    pub fn displayed(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, Event::Display(_)))
            .count()
    }
}

impl Shell for RecordingShell {
    fn bind(&mut self, name: &str, table: RecordBatch) {
        self.events.push(Event::Bind(name.to_string(), table));
    }

    fn display(&mut self, table: &RecordBatch) {
        self.events.push(Event::Display(table.clone()));
    }

    fn print(&mut self, message: &str) {
        self.events.push(Event::Print(message.to_string()));
    }

    fn print_error(&mut self, trace: &str) {
        self.events.push(Event::Error(trace.to_string()));
    }
}

/// Two-row table: ID, NAME
pub fn sample_table() -> RecordBatch {
    named_table(&["Alice", "Bob"])
}

/// Table with one row per name
pub fn named_table(names: &[&str]) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("ID", DataType::Int64, true),
        Field::new("NAME", DataType::Utf8, true),
    ]));
    let ids: Vec<i64> = (1..=names.len() as i64).collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(names.to_vec())),
        ],
    )
    .unwrap()
}

/// Valid connection parameters
pub fn params() -> ConnectionParams {
    AuthArgs::parse("--account acme --user jane --role ANALYST --private_key_path /keys/rsa_key.p8")
        .resolve_with(|_| None)
        .unwrap()
}
