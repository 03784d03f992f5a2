//! CLI surface (§6): argument parsing and dispatch. Classified out of scope
//! by the specification core, but required for a runnable binary.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "taskloop", version, about = "Local task-loop runner")]
pub struct Cli {
    /// Project root; defaults to the current directory.
    #[arg(short = 'C', long = "project", global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create instance files if absent.
    Init(commands::init::InitArgs),
    /// Add a single task.
    Add(commands::add::AddArgs),
    /// Add a batch of tasks from a file or stdin.
    AddBatch(commands::add_batch::AddBatchArgs),
    /// Show task counts by status.
    Status(commands::status::StatusArgs),
    /// Show one task.
    Show(commands::show::ShowArgs),
    /// Reset a task back to todo.
    Reset(commands::reset::ResetArgs),
    /// Remove a task from rotation.
    Skip(commands::skip::SkipArgs),
    /// Tail the run log.
    Runs(commands::runs::RunsArgs),
    /// Run the execution loop.
    Go(commands::go::GoArgs),
}

/// Resolves the project root used by all commands.
pub fn project_root(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.project_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(std::env::current_dir()?),
    }
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let root = project_root(&cli)?;
    match cli.command {
        Commands::Init(args) => commands::init::run(&root, args),
        Commands::Add(args) => commands::add::run(&root, args).await,
        Commands::AddBatch(args) => commands::add_batch::run(&root, args).await,
        Commands::Status(args) => commands::status::run(&root, args),
        Commands::Show(args) => commands::show::run(&root, args),
        Commands::Reset(args) => commands::reset::run(&root, args).await,
        Commands::Skip(args) => commands::skip::run(&root, args).await,
        Commands::Runs(args) => commands::runs::run(&root, args),
        Commands::Go(args) => commands::go::run(&root, args).await,
    }
}
