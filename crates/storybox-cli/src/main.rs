//! Storybox CLI - share short photo stories from the terminal
//!
//! Works offline: posts made without a connection are kept as drafts and
//! replayed by `storybox sync` or `storybox watch`.

mod cli;
mod commands;
mod context;
mod error;
mod platform;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::auth::{run_login, run_logout, run_register, run_whoami};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::export::run_export;
use crate::commands::maintenance::{run_clear, run_usage};
use crate::commands::push::run_push;
use crate::commands::settings::run_settings;
use crate::commands::stories::{
    run_delete, run_map, run_post, run_prune, run_show, run_stories,
};
use crate::commands::sync::{run_outbox, run_sync, run_watch};
use crate::context::AppContext;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storybox=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Completions { shell, output } = &command {
        return run_completions(*shell, output.as_deref());
    }

    let context = AppContext::open(cli.db_path, cli.config, cli.offline)?;

    match command {
        Commands::Login { email, password } => run_login(&context, &email, &password).await?,
        Commands::Register {
            name,
            email,
            password,
        } => run_register(&context, &name, &email, &password).await?,
        Commands::Logout => run_logout(&context).await?,
        Commands::Whoami => run_whoami(&context).await?,
        Commands::Stories {
            limit,
            cached,
            json,
        } => run_stories(&context, limit, cached, json).await?,
        Commands::Show { id } => run_show(&context, &id).await?,
        Commands::Post {
            description,
            photo,
            lat,
            lon,
        } => run_post(&context, &description, &photo, lat, lon).await?,
        Commands::Delete { id } => run_delete(&context, &id).await?,
        Commands::Prune { older_than_days } => run_prune(&context, older_than_days).await?,
        Commands::Map { json } => run_map(&context, json).await?,
        Commands::Outbox { all, json } => run_outbox(&context, all, json).await?,
        Commands::Sync => run_sync(&context).await?,
        Commands::Watch { interval } => run_watch(&context, interval).await?,
        Commands::Settings { command } => run_settings(&context, command).await?,
        Commands::Usage => run_usage(&context).await?,
        Commands::Clear { yes } => run_clear(&context, yes).await?,
        Commands::Export { format, output } => {
            run_export(&context, format, output.as_deref()).await?;
        }
        Commands::Push { command } => run_push(&context, command).await?,
        Commands::Config { command } => run_config(&context, command)?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
