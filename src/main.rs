use clap::Parser;

use prism::cli::Cli;
use prism::core::style;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        eprintln!("{}", style::error(&format!("{e:#}")));
        std::process::exit(1);
    }
}
