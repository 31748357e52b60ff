//! Luma - end-to-end encrypted photo uploads

mod config;
mod upload;
mod watch;

use clap::{Parser, Subcommand};
use config::{Account, AccountArgs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "luma")]
#[command(about = "Upload photos to an end-to-end encrypted library")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    account: AccountArgs,

    /// Enable debug logging
    #[arg(short, long, env = "LUMA_DEBUG", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload images with end-to-end encryption
    Upload(upload::UploadArgs),
    /// Watch a folder and automatically upload new images
    Watch(watch::WatchArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "luma_cli={0},luma_uploader={0},luma_watcher={0},luma_api={0},luma_store={0}",
                    log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let account = Account::build(&cli.account)?;

    let exit_code = match cli.command {
        Command::Upload(args) => upload::run(account, args).await?,
        Command::Watch(args) => watch::run(account, args).await?,
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
