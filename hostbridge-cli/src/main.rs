mod cli;
mod commands;
mod config;
mod session;
mod transcript;

use clap::Parser;
use hostbridge_host::demo;

use crate::cli::{Cli, Command};
use crate::session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let resolved = config::resolve(cli.config.as_deref())?.with_overrides(cli.timeout_ms, cli.no_timeout);
    match &resolved.source {
        Some(path) => log::info!("using config {}", path.display()),
        None => log::info!("no config file found, using defaults"),
    }

    if let Command::List = cli.command {
        return commands::list_cmd::run(&demo::dispatcher());
    }

    let session = Session::start(demo::dispatcher(), &resolved.bridge);
    let result = match &cli.command {
        Command::Invoke { command, payload } => {
            commands::invoke_cmd::run(&session, command, payload.as_deref()).await
        }
        Command::Void { command, payload } => commands::void_cmd::run(&session, command, payload.as_deref()).await,
        Command::Text { command, text } => commands::text_cmd::run(&session, command, text.as_deref()).await,
        Command::Demo => commands::demo_cmd::run(&session).await.map(|transcript| {
            for line in transcript.lines() {
                println!("{line}");
            }
            println!("{} calls, {} failed", transcript.entries.len(), transcript.failures());
        }),
        Command::List => Ok(()),
    };

    let stats = session.shutdown().await?;
    log::info!(
        "host answered {} call(s), rejected {}",
        stats.resolved,
        stats.rejected
    );
    result
}
