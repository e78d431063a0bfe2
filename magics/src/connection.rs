//! Connection parameters and the connector abstraction
//!
//! The extension never talks to a warehouse directly. It opens connections
//! through a [`Connector`], runs statements on the returned [`Connection`] and
//! reads results from a [`Cursor`]. [`crate::client::SqlApiConnector`] is the
//! HTTP implementation; tests script their own.

use arrow::array::RecordBatch;

use crate::error::{Error, Result};

/// Environment variable names, in option order
pub const ENV_ACCOUNT: &str = "SNOWFLAKE_ACCOUNT";
pub const ENV_USER: &str = "SNOWFLAKE_USER";
pub const ENV_ROLE: &str = "SNOWFLAKE_ROLE";
pub const ENV_PRIVATE_KEY_PATH: &str = "SNOWFLAKE_PRIVATE_KEY_PATH";
pub const ENV_PRIVATE_KEY_PASSPHRASE: &str = "SNOWFLAKE_PRIVATE_KEY_PASSPHRASE";
pub const ENV_WAREHOUSE: &str = "SNOWFLAKE_WAREHOUSE";
pub const ENV_DATABASE: &str = "SNOWFLAKE_DATABASE";
pub const ENV_SCHEMA: &str = "SNOWFLAKE_SCHEMA";
pub const ENV_HOST: &str = "SNOWFLAKE_HOST";

/// Options recognized on the `%snowauth` line
///
/// Every field is optional here; [`AuthArgs::resolve`] fills the gaps from the
/// environment and checks that the required ones are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthArgs {
    pub account: Option<String>,
    pub user: Option<String>,
    pub role: Option<String>,
    pub private_key_path: Option<String>,
    pub private_key_passphrase: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub host: Option<String>,
}

impl AuthArgs {
    /// Parse a `%snowauth` argument line
    ///
    /// Tokens are split shell-style. Both `--opt value` and `--opt=value` are
    /// accepted; anything unrecognized is ignored. An option without a value
    /// stays unset.
    pub fn parse(line: &str) -> Self {
        let tokens = shlex::split(line).unwrap_or_else(|| {
            tracing::warn!("Unbalanced quoting in %snowauth line, splitting on whitespace");
            line.split_whitespace().map(str::to_string).collect()
        });

        let mut args = AuthArgs::default();
        let mut iter = tokens.into_iter().peekable();
        while let Some(token) = iter.next() {
            let Some(option) = token.strip_prefix("--") else {
                continue;
            };
            let (name, inline_value) = match option.split_once('=') {
                Some((name, value)) => (name.to_string(), Some(value.to_string())),
                None => (option.to_string(), None),
            };
            let Some(slot) = args.slot(&name) else {
                tracing::debug!("Ignoring unknown %snowauth option --{}", name);
                continue;
            };
            // An option directly followed by another option has no value
            let value = match inline_value {
                Some(value) => Some(value),
                None => iter.next_if(|next| !next.starts_with("--")),
            };
            if value.is_some() {
                *slot = value;
            }
        }
        args
    }

    fn slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            "account" => Some(&mut self.account),
            "user" => Some(&mut self.user),
            "role" => Some(&mut self.role),
            "private_key_path" => Some(&mut self.private_key_path),
            "private_key_passphrase" => Some(&mut self.private_key_passphrase),
            "warehouse" => Some(&mut self.warehouse),
            "database" => Some(&mut self.database),
            "schema" => Some(&mut self.schema),
            "host" => Some(&mut self.host),
            _ => None,
        }
    }

    /// Fill missing options from the process environment
    pub fn resolve(self) -> Result<ConnectionParams> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Fill missing options from `env` and validate the result
    pub fn resolve_with<F>(self, env: F) -> Result<ConnectionParams>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |value: Option<String>, var: &str| {
            value
                .filter(|v| !v.is_empty())
                .or_else(|| env(var).filter(|v| !v.is_empty()))
        };

        let account = pick(self.account, ENV_ACCOUNT);
        let user = pick(self.user, ENV_USER);
        let role = pick(self.role, ENV_ROLE);
        let private_key_path = pick(self.private_key_path, ENV_PRIVATE_KEY_PATH);

        let missing: Vec<&'static str> = [
            ("account", account.is_none()),
            ("user", user.is_none()),
            ("role", role.is_none()),
            ("private_key_path", private_key_path.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        match (account, user, role, private_key_path) {
            (Some(account), Some(user), Some(role), Some(private_key_path)) => {
                Ok(ConnectionParams {
                    account,
                    user,
                    role,
                    private_key_path,
                    private_key_passphrase: pick(
                        self.private_key_passphrase,
                        ENV_PRIVATE_KEY_PASSPHRASE,
                    ),
                    warehouse: pick(self.warehouse, ENV_WAREHOUSE),
                    database: pick(self.database, ENV_DATABASE),
                    schema: pick(self.schema, ENV_SCHEMA),
                    host: pick(self.host, ENV_HOST),
                })
            }
            _ => Err(Error::MissingParameters(missing)),
        }
    }
}

/// Validated connection parameters
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub account: String,
    pub user: String,
    pub role: String,
    pub private_key_path: String,
    pub private_key_passphrase: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub host: Option<String>,
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("role", &self.role)
            .field("private_key_path", &self.private_key_path)
            .field(
                "private_key_passphrase",
                &self.private_key_passphrase.as_ref().map(|_| "***"),
            )
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("host", &self.host)
            .finish()
    }
}

/// Column description of a result set
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescription {
    pub name: String,
    pub r#type: String,
    pub scale: Option<i32>,
    pub nullable: bool,
}

/// Opens connections
pub trait Connector {
    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Connection>>;
}

/// An open warehouse connection
pub trait Connection {
    /// Whether the connection can no longer be used
    fn is_closed(&self) -> bool;

    /// Execute one statement
    fn execute(&mut self, statement: &str) -> Result<Box<dyn Cursor>>;
}

/// Result of one executed statement
pub trait Cursor {
    /// Affected rows for DML statements
    fn row_count(&self) -> Option<i64>;

    /// Row description, `None` when the statement produced no result set
    fn description(&self) -> Option<&[ColumnDescription]>;

    /// Fetch the full result set as one table
    ///
    /// Returns [`Error::NotSupported`] when the result cannot be
    /// materialized as a table.
    fn fetch_table(&mut self) -> Result<RecordBatch>;

    /// Consume and discard any pending rows
    fn fetch_all(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_all_options() {
        let args = AuthArgs::parse(
            "--account acme --user 'Jane Doe' --role=ANALYST --private_key_path /k.p8 --private_key_passphrase s3cret",
        );

        assert_eq!(args.account.as_deref(), Some("acme"));
        assert_eq!(args.user.as_deref(), Some("Jane Doe"));
        assert_eq!(args.role.as_deref(), Some("ANALYST"));
        assert_eq!(args.private_key_path.as_deref(), Some("/k.p8"));
        assert_eq!(args.private_key_passphrase.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_parse_ignores_unknown() {
        let args = AuthArgs::parse("positional --verbose --account acme --nope x");

        assert_eq!(args.account.as_deref(), Some("acme"));
        assert_eq!(args.user, None);
    }

    #[test]
    fn test_option_without_value() {
        let args = AuthArgs::parse("--account --user jane --role");

        assert_eq!(args.account, None);
        assert_eq!(args.user.as_deref(), Some("jane"));
        assert_eq!(args.role, None);

        let env = env_of(&[
            (ENV_ACCOUNT, "acme"),
            (ENV_ROLE, "ANALYST"),
            (ENV_PRIVATE_KEY_PATH, "/k.p8"),
        ]);
        let params = args.resolve_with(env).unwrap();
        assert_eq!(params.account, "acme");
        assert_eq!(params.user, "jane");
    }

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(AuthArgs::parse(""), AuthArgs::default());
    }

    #[test]
    fn test_resolve_from_env_only() {
        let env = env_of(&[
            (ENV_ACCOUNT, "acme"),
            (ENV_USER, "jane"),
            (ENV_ROLE, "ANALYST"),
            (ENV_PRIVATE_KEY_PATH, "/k.p8"),
        ]);
        let params = AuthArgs::default().resolve_with(env).unwrap();

        assert_eq!(params.account, "acme");
        assert_eq!(params.user, "jane");
        assert_eq!(params.role, "ANALYST");
        assert_eq!(params.private_key_path, "/k.p8");
        assert_eq!(params.private_key_passphrase, None);
    }

    #[test]
    fn test_arguments_take_precedence() {
        let env = env_of(&[
            (ENV_ACCOUNT, "from-env"),
            (ENV_USER, "jane"),
            (ENV_ROLE, "ANALYST"),
            (ENV_PRIVATE_KEY_PATH, "/k.p8"),
        ]);
        let params = AuthArgs::parse("--account from-arg")
            .resolve_with(env)
            .unwrap();

        assert_eq!(params.account, "from-arg");
    }

    #[test]
    fn test_empty_argument_falls_back_to_env() {
        let env = env_of(&[
            (ENV_ACCOUNT, "acme"),
            (ENV_USER, "jane"),
            (ENV_ROLE, "ANALYST"),
            (ENV_PRIVATE_KEY_PATH, "/k.p8"),
        ]);
        let params = AuthArgs::parse("--account ''").resolve_with(env).unwrap();

        assert_eq!(params.account, "acme");
    }

    #[test]
    fn test_missing_required() {
        let env = env_of(&[(ENV_ACCOUNT, "acme"), (ENV_PRIVATE_KEY_PASSPHRASE, "x")]);
        let err = AuthArgs::parse("--user jane").resolve_with(env).unwrap_err();

        match err {
            Error::MissingParameters(missing) => {
                assert_eq!(missing, vec!["role", "private_key_path"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_debug_hides_passphrase() {
        let params = AuthArgs::parse(
            "--account a --user u --role r --private_key_path k --private_key_passphrase hunter2",
        )
        .resolve_with(|_| None)
        .unwrap();

        assert!(!format!("{params:?}").contains("hunter2"));
    }
}
