//! Spansim CLI entry point.

use spansim_lib::cli::{self, Cli};
use spansim_lib::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Execute the command
    cli::execute(cli).await
}
