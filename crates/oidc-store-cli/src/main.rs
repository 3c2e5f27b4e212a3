mod cli;
mod commands;
mod config;
mod context;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;
use oidc_store::StoreError;

use cli::{Cli, Commands, StoreCommands};
use config::CliConfig;
use context::Context;
use output::print_error;

#[tokio::main]
async fn main() {
    // Load .env file if present; it usually carries the *_TABLE_NAME variables.
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let cli = Cli::parse();
    observability::init_tracing();

    let cfg = match CliConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            print_error(&format!("Configuration error: {e:#}"));
            std::process::exit(2);
        }
    };
    observability::apply_logging_level(&cfg.logging.level);

    if let Err(e) = run(cli, cfg).await {
        print_error(&format!("{e:#}"));
        let code = match e.downcast_ref::<StoreError>() {
            Some(err) if err.is_configuration() => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}

async fn run(cli: Cli, cfg: CliConfig) -> Result<()> {
    let command = match cli.command {
        Commands::Demo => return commands::demo::run().await,
        Commands::Store(command) => command,
    };

    let backend = cli.backend.unwrap_or(cfg.backend);
    let ctx = Context::build(&cfg, backend).await?;

    match &command {
        StoreCommands::Upsert(args) => commands::artifact::upsert(&ctx, args).await?,
        StoreCommands::Find(args) => commands::artifact::find(&ctx, args).await?,
        StoreCommands::Consume(args) => commands::artifact::consume(&ctx, args).await?,
        StoreCommands::Destroy(args) => commands::artifact::destroy(&ctx, args).await?,
        StoreCommands::Revoke(args) => commands::artifact::revoke(&ctx, args).await?,
        StoreCommands::Schema => commands::maintenance::schema(&ctx).await?,
        StoreCommands::Cleanup => commands::maintenance::cleanup(&ctx).await?,
    }

    ctx.persist()?;
    Ok(())
}
