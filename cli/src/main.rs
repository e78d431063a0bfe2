//! Snowflake SQL shell
//!
//! Interactive host for the `%snowauth` and `%%snowsql` commands.

use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;

use clap::Parser;
use magics::{Session, SnowflakeMagics, SqlApiConnector};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod repl;

use repl::Repl;

#[derive(Parser)]
#[command(name = "snowsql-shell")]
#[command(about = "Run %snowauth and %%snowsql commands against Snowflake")]
#[command(version)]
struct Cli {
    /// Read commands from this file instead of stdin
    script: Option<PathBuf>,

    /// Directory that relative FILE() paths are resolved against
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,
}

fn main() -> io::Result<()> {
    // Logs go to stderr, command output to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cli=warn,magics=warn,notebook=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let magics = SnowflakeMagics::new(SqlApiConnector::new()).with_base_dir(&cli.base_dir);
    let mut repl = Repl::new(magics, Session::stdout());
    tracing::info!("Session {} started", repl.session().id);

    match cli.script {
        Some(path) => repl.run(BufReader::new(File::open(path)?), false),
        None => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            repl.run(stdin.lock(), interactive)
        }
    }
}
