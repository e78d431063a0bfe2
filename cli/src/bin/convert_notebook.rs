//! Convert SQL cells of a notebook into `%%snowsql` cells

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "convert-notebook")]
#[command(about = "Convert Snowflake SQL notebook cells to snowsql magic cells.")]
struct Cli {
    /// The input Jupyter notebook file.
    input_file: PathBuf,

    /// The name for the output Jupyter notebook file.
    output_file: PathBuf,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notebook=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Failures are reported, never signaled through the exit code
    match notebook::convert_notebook(&cli.input_file, &cli.output_file) {
        Ok(_) => println!(
            "Successfully converted {} to {}",
            cli.input_file.display(),
            cli.output_file.display()
        ),
        Err(e) => println!("{}", e.user_message()),
    }
}
