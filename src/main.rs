use clap::Parser;
use parex::cli::{Cli, Output};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let quiet = cli.quiet;

    match cli.run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            Output::new(false, quiet).error(&format!("{e:#}"));
            std::process::exit(1);
        }
    }
}
