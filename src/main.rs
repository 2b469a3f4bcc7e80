mod cli;
mod commands;
mod config;
mod error;
mod fetch;
mod mcp;
mod observe;
mod page_range;
mod pdf;
mod server;
mod sink;
mod stamper;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout belongs to command output and the MCP transport
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pdfstamp=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let config = config::Config::from_args(&args)?;
            server::run(config).await?;
        }
        Commands::Mcp => {
            mcp::run_server().await?;
        }
        Commands::Stamp {
            path,
            text,
            pages,
            output,
            style,
        } => {
            commands::stamp::run(&path, &text, &pages, &output, &style.options())?;
        }
        Commands::Pages { expression, total } => {
            commands::pages::run(&expression, total)?;
        }
    }

    Ok(())
}
