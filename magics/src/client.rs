//! Snowflake SQL API v2 client
//!
//! [`SqlApiConnector`] opens [`Connection`]s that run each statement as one
//! `POST /api/v2/statements` call, authenticating with a key-pair JWT.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, RecordBatchOptions, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use uuid::Uuid;

use crate::auth::KeyPairAuth;
use crate::connection::{ColumnDescription, Connection, ConnectionParams, Connector, Cursor};
use crate::error::{Error, Result};
use crate::protocol::{ErrorResponse, StatementRequest, StatementResponse};

const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";

/// Connector for the SQL API
pub struct SqlApiConnector {
    /// Delay between status polls of a running statement
    poll_interval: Duration,

    /// Send a probe query when connecting
    probe: bool,
}

impl SqlApiConnector {
    /// Create a new connector
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            probe: true,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Skip the probe query, connecting only loads the key
    pub fn without_probe(mut self) -> Self {
        self.probe = false;
        self
    }
}

impl Default for SqlApiConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for SqlApiConnector {
    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Connection>> {
        let auth = KeyPairAuth::new(
            &params.account,
            &params.user,
            Path::new(&params.private_key_path),
            params.private_key_passphrase.as_deref(),
        )?;

        let base_url = params
            .host
            .clone()
            .unwrap_or_else(|| {
                format!("https://{}.snowflakecomputing.com", params.account.to_lowercase())
            })
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::info!("Connecting to {} as {}", base_url, params.user);

        let mut connection = SqlApiConnection {
            client,
            base_url,
            auth,
            params: params.clone(),
            poll_interval: self.poll_interval,
            closed: false,
        };

        if self.probe {
            connection.execute("SELECT 1")?.fetch_all()?;
        }

        Ok(Box::new(connection))
    }
}

/// Outcome of one API round trip
enum Reply {
    Done(StatementResponse),
    Pending(String),
}

/// An authenticated SQL API session
pub struct SqlApiConnection {
    client: Client,
    base_url: String,
    auth: KeyPairAuth,
    params: ConnectionParams,
    poll_interval: Duration,
    closed: bool,
}

impl SqlApiConnection {
    fn statements_url(&self) -> String {
        format!("{}/api/v2/statements", self.base_url)
    }

    fn authorized(&mut self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.auth.token()?;
        Ok(builder
            .bearer_auth(token)
            .header(TOKEN_TYPE_HEADER, "KEYPAIR_JWT")
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    fn send(&mut self, builder: RequestBuilder) -> Result<Reply> {
        let response = self.authorized(builder)?.send()?;
        let status = response.status();

        match status {
            StatusCode::OK => Ok(Reply::Done(response.json()?)),
            StatusCode::ACCEPTED => {
                let pending: StatementResponse = response.json()?;
                let handle = pending.statement_handle.ok_or_else(|| {
                    Error::Internal("202 response without statement handle".to_string())
                })?;
                Ok(Reply::Pending(handle))
            }
            _ => {
                if status == StatusCode::UNAUTHORIZED {
                    tracing::warn!("Session rejected by {}, marking connection closed", self.base_url);
                    self.closed = true;
                }
                let body = response.text()?;
                Err(api_error(status, &body))
            }
        }
    }

    /// Poll a running statement until it completes
    fn wait(&mut self, handle: String) -> Result<StatementResponse> {
        let url = format!("{}/{}", self.statements_url(), handle);
        loop {
            std::thread::sleep(self.poll_interval);
            tracing::debug!("Polling statement {}", handle);
            let request = self.client.get(&url);
            match self.send(request)? {
                Reply::Done(response) => return Ok(response),
                Reply::Pending(_) => continue,
            }
        }
    }
}

impl Connection for SqlApiConnection {
    fn is_closed(&self) -> bool {
        self.closed
    }

    fn execute(&mut self, statement: &str) -> Result<Box<dyn Cursor>> {
        if self.closed {
            return Err(Error::Closed);
        }

        let mut request = StatementRequest::new(statement);
        request.role = Some(self.params.role.clone());
        request.warehouse = self.params.warehouse.clone();
        request.database = self.params.database.clone();
        request.schema = self.params.schema.clone();

        tracing::debug!("Executing statement: {}", statement);

        let builder = self
            .client
            .post(self.statements_url())
            .query(&[("requestId", Uuid::new_v4().to_string())])
            .json(&request);

        let response = match self.send(builder)? {
            Reply::Done(response) => response,
            Reply::Pending(handle) => self.wait(handle)?,
        };

        let partitions = match (&response.statement_handle, partition_count(&response)) {
            (Some(handle), count) if count > 1 => Some(PartitionFetcher {
                client: self.client.clone(),
                url: format!("{}/{}", self.statements_url(), handle),
                token: self.auth.token()?,
                count,
            }),
            _ => None,
        };

        Ok(Box::new(SqlApiCursor::new(response, partitions)))
    }

}

fn partition_count(response: &StatementResponse) -> usize {
    response
        .result_set_meta_data
        .as_ref()
        .and_then(|meta| meta.partition_info.as_ref())
        .map(Vec::len)
        .unwrap_or(1)
}

fn api_error(status: StatusCode, body: &str) -> Error {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error) => Error::Api {
            code: error.code.unwrap_or_else(|| status.as_u16().to_string()),
            message: error.message.unwrap_or_else(|| status.to_string()),
            sql_state: error.sql_state.unwrap_or_else(|| "XX000".to_string()),
        },
        Err(_) => Error::Api {
            code: status.as_u16().to_string(),
            message: if body.is_empty() {
                status.to_string()
            } else {
                body.to_string()
            },
            sql_state: "XX000".to_string(),
        },
    }
}

/// Fetches partitions 1.. of a large result
struct PartitionFetcher {
    client: Client,
    url: String,
    token: String,
    count: usize,
}

impl PartitionFetcher {
    fn fetch(&self, partition: usize) -> Result<Vec<Vec<Option<String>>>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("partition", partition.to_string())])
            .bearer_auth(&self.token)
            .header(TOKEN_TYPE_HEADER, "KEYPAIR_JWT")
            .header(reqwest::header::ACCEPT, "application/json")
            .send()?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(api_error(status, &response.text()?));
        }

        let page: StatementResponse = response.json()?;
        Ok(page.data.unwrap_or_default())
    }
}

/// Result of one SQL API statement
pub struct SqlApiCursor {
    response: StatementResponse,
    columns: Option<Vec<ColumnDescription>>,
    partitions: Option<PartitionFetcher>,
    consumed: bool,
}

impl SqlApiCursor {
    fn new(response: StatementResponse, partitions: Option<PartitionFetcher>) -> Self {
        let columns = response
            .result_set_meta_data
            .as_ref()
            .filter(|meta| !meta.row_type.is_empty())
            .map(|meta| {
                meta.row_type
                    .iter()
                    .map(|column| ColumnDescription {
                        name: column.name.clone(),
                        r#type: column.r#type.clone(),
                        scale: column.scale,
                        nullable: column.nullable,
                    })
                    .collect()
            });

        Self {
            response,
            columns,
            partitions,
            consumed: false,
        }
    }
}

impl Cursor for SqlApiCursor {
    fn row_count(&self) -> Option<i64> {
        self.response.affected_rows()
    }

    fn description(&self) -> Option<&[ColumnDescription]> {
        self.columns.as_deref()
    }

    fn fetch_table(&mut self) -> Result<RecordBatch> {
        let columns = self.columns.clone().unwrap_or_default();

        if let Some(format) = self
            .response
            .result_set_meta_data
            .as_ref()
            .and_then(|meta| meta.format.as_deref())
        {
            if !format.eq_ignore_ascii_case("jsonv2") {
                return Err(Error::NotSupported(format!("result format {format}")));
            }
        }

        if self.consumed {
            return rows_to_record_batch(&columns, &[]);
        }
        self.consumed = true;

        let mut rows = self.response.data.take().unwrap_or_default();
        if let Some(fetcher) = &self.partitions {
            for partition in 1..fetcher.count {
                rows.extend(fetcher.fetch(partition)?);
            }
        }

        rows_to_record_batch(&columns, &rows)
    }

    fn fetch_all(&mut self) -> Result<()> {
        // Remaining partitions stay on the server
        self.consumed = true;
        self.response.data = None;
        Ok(())
    }
}

/// Map a Snowflake column type to an Arrow type
fn snowflake_type_to_arrow(column: &ColumnDescription) -> DataType {
    match column.r#type.to_uppercase().as_str() {
        "FIXED" | "NUMBER" if column.scale.unwrap_or(0) == 0 => DataType::Int64,
        "REAL" | "FLOAT" | "DOUBLE" => DataType::Float64,
        "BOOLEAN" => DataType::Boolean,
        _ => DataType::Utf8,
    }
}

/// Convert jsonv2 rows into a record batch
///
/// A column whose values do not parse as its mapped type falls back to Utf8.
pub fn rows_to_record_batch(
    columns: &[ColumnDescription],
    rows: &[Vec<Option<String>>],
) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());

    for (i, column) in columns.iter().enumerate() {
        let values: Vec<Option<&str>> = rows
            .iter()
            .map(|row| row.get(i).and_then(|cell| cell.as_deref()))
            .collect();

        let (data_type, array) = column_array(snowflake_type_to_arrow(column), &values);
        fields.push(Field::new(&column.name, data_type, true));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
    let batch =
        RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
    Ok(batch)
}

fn column_array(data_type: DataType, values: &[Option<&str>]) -> (DataType, ArrayRef) {
    match data_type {
        DataType::Int64 => {
            if let Some(parsed) = parse_all(values, |v| v.parse::<i64>().ok()) {
                return (DataType::Int64, Arc::new(Int64Array::from(parsed)));
            }
        }
        DataType::Float64 => {
            if let Some(parsed) = parse_all(values, |v| v.parse::<f64>().ok()) {
                return (DataType::Float64, Arc::new(Float64Array::from(parsed)));
            }
        }
        DataType::Boolean => {
            if let Some(parsed) = parse_all(values, parse_bool) {
                return (DataType::Boolean, Arc::new(BooleanArray::from(parsed)));
            }
        }
        _ => {}
    }

    (DataType::Utf8, Arc::new(StringArray::from(values.to_vec())))
}

fn parse_all<T, F>(values: &[Option<&str>], parse: F) -> Option<Vec<Option<T>>>
where
    F: Fn(&str) -> Option<T>,
{
    values
        .iter()
        .map(|value| match value {
            Some(v) => parse(v).map(Some),
            None => Some(None),
        })
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
