//! The `%snowauth` and `%%snowsql` commands
//!
//! [`SnowflakeMagics`] owns the connection state. The host session calls
//! [`SnowflakeMagics::snowauth`] for the line command and
//! [`SnowflakeMagics::snowsql`] for the cell command, passing itself as the
//! [`Shell`] that receives messages, tables and variable bindings.

use std::path::{Path, PathBuf};

use crate::connection::{AuthArgs, Connection, ConnectionParams, Connector};
use crate::error::{Error, Result};
use crate::executor::{execute_batch, CellOutput};
use crate::session::Shell;
use crate::sql_rewriter;

/// Name of the line command
pub const AUTH_COMMAND: &str = "snowauth";

/// Name of the cell command
pub const SQL_COMMAND: &str = "snowsql";

/// Connection lifecycle as seen by the commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No successful `%snowauth` yet
    Uninitialized,
    Connected,
    /// Authenticated, but the connection closed; reopened on next use
    Closed,
}

/// Snowflake SQL magics
pub struct SnowflakeMagics<C: Connector> {
    connector: C,

    /// Parameters of the last successful `%snowauth`
    params: Option<ConnectionParams>,

    connection: Option<Box<dyn Connection>>,

    initialized: bool,

    /// Base directory for relative FILE() paths
    base_dir: PathBuf,
}

impl<C: Connector> SnowflakeMagics<C> {
    /// Create the magics around a connector
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            params: None,
            connection: None,
            initialized: false,
            base_dir: PathBuf::from("."),
        }
    }

    /// Resolve FILE() directives against `base_dir`
    pub fn with_base_dir(mut self, base_dir: impl AsRef<Path>) -> Self {
        self.base_dir = base_dir.as_ref().to_path_buf();
        self
    }

    pub fn state(&self) -> ConnectionState {
        match &self.connection {
            _ if !self.initialized => ConnectionState::Uninitialized,
            Some(connection) if !connection.is_closed() => ConnectionState::Connected,
            _ => ConnectionState::Closed,
        }
    }

    /// Parameters of the current session, if authenticated
    pub fn params(&self) -> Option<&ConnectionParams> {
        self.params.as_ref()
    }

    /// `%snowauth --account <account> --user <user> --role <role> --private_key_path <path> [--private_key_passphrase <passphrase>]`
    ///
    /// Options not given on the line are read from `SNOWFLAKE_ACCOUNT`,
    /// `SNOWFLAKE_USER`, `SNOWFLAKE_ROLE`, `SNOWFLAKE_PRIVATE_KEY_PATH` and
    /// `SNOWFLAKE_PRIVATE_KEY_PASSPHRASE`.
    pub fn snowauth(&mut self, line: &str, shell: &mut dyn Shell) {
        self.snowauth_with_env(line, shell, |name| std::env::var(name).ok());
    }

    /// `%snowauth` with an explicit environment lookup
    pub fn snowauth_with_env<F>(&mut self, line: &str, shell: &mut dyn Shell, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        shell.print("Initializing new Snowflake connection...");

        let params = match AuthArgs::parse(line).resolve_with(env) {
            Ok(params) => params,
            Err(e) => {
                tracing::warn!("{}", e);
                shell.print(
                    "Error: Missing connection parameters for initialization. Provide them as arguments or environment variables.",
                );
                return;
            }
        };

        if self.connection.take().is_some() {
            tracing::info!("Dropping previous connection before re-authenticating");
        }

        match self.connector.connect(&params) {
            Ok(connection) => {
                tracing::info!("Connected to account {} as {}", params.account, params.user);
                self.connection = Some(connection);
                self.params = Some(params);
                self.initialized = true;
                shell.print("Snowflake connection successful.");
            }
            Err(e) => {
                tracing::error!("Connection failed: {}", e);
                self.initialized = false;
                self.params = None;
                shell.print_error(&format!(
                    "An error occurred in initialization: {}",
                    e.trace()
                ));
            }
        }
    }

    /// `%%snowsql [variable_name]`
    ///
    /// Executes the statements of `cell`. With a variable name, the last
    /// result table is bound to it in the session.
    pub fn snowsql(&mut self, line: &str, cell: &str, shell: &mut dyn Shell) {
        let var_name = line.split_whitespace().next();

        if !self.initialized {
            shell.print("Error: Snowflake connection not initialized. Please run %snowauth first.");
            return;
        }

        let outputs = match self.run_cell(cell) {
            Ok(outputs) => outputs,
            Err(e) => {
                tracing::error!("Cell execution failed: {}", e);
                shell.print_error(&format!("An error occurred: {}", e.trace()));
                return;
            }
        };

        let tables: Vec<_> = outputs.iter().filter_map(CellOutput::as_table).collect();

        if let Some(var_name) = var_name {
            if tables.len() > 1 {
                shell.print(&format!(
                    "Warning: Multiple result tables returned, only the last one will be assigned to '{}'.",
                    var_name
                ));
            }

            match tables.last() {
                Some(table) => {
                    shell.bind(var_name, (*table).clone());
                    shell.print(&format!("Result stored in '{}'.", var_name));
                }
                None => shell.print(&format!(
                    "Warning: No result table returned to assign to '{}'.",
                    var_name
                )),
            }
        }

        if outputs.is_empty() {
            shell.print("Query executed successfully, but it did not produce any results to display.");
            return;
        }

        for output in &outputs {
            match output {
                CellOutput::Table(table) => shell.display(table),
                CellOutput::Message(message) => shell.print(message),
            }
        }
    }

    fn run_cell(&mut self, cell: &str) -> Result<Vec<CellOutput>> {
        let sql = sql_rewriter::rewrite_file_directives(cell, &self.base_dir);
        let connection = self.ensure_connection()?;
        execute_batch(connection, &sql)
    }

    /// Current connection, reopened with the saved parameters if closed
    fn ensure_connection(&mut self) -> Result<&mut (dyn Connection + 'static)> {
        let usable = self
            .connection
            .as_ref()
            .is_some_and(|connection| !connection.is_closed());

        if !usable {
            let params = self
                .params
                .as_ref()
                .ok_or_else(|| Error::Internal("no saved connection parameters".to_string()))?;
            tracing::info!("Reopening connection to account {}", params.account);
            self.connection = Some(self.connector.connect(params)?);
        }

        self.connection
            .as_deref_mut()
            .ok_or_else(|| Error::Internal("connection unavailable".to_string()))
    }
}
