//! CLI routing and command dispatch.

use crate::core::database::{Database, Sanitized};
use crate::core::lifecycle::ScriptedDatabase;
use crate::core::settings::{self, SettingsFile};
use crate::models::request::{InitializeRequest, Statements};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub mod credential;
pub mod params;
pub mod render;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub settings: SettingsFile,
    /// Where `settings` was read from; root rotations are written back here.
    pub config_path: PathBuf,
    pub non_interactive: bool,
    /// Cancelled on Ctrl-C; running scripts are killed.
    pub cancel: CancellationToken,
}

impl CliContext {
    /// Build the sanitized engine and initialize it from the settings file.
    pub async fn engine(&self) -> Result<Sanitized<ScriptedDatabase>> {
        let db = crate::core::database::new(self.settings.executor_config());
        let req = InitializeRequest {
            config: self.settings.raw_config()?,
            verify_connection: self.settings.engine.verify_connection,
        };
        db.initialize(req, &self.cancel)
            .await
            .context("initialize engine")?;
        Ok(db)
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "goamet-credscript",
    version,
    about = "Scripted credential lifecycle: render and run create/rotate/delete scripts"
)]
pub struct Cli {
    /// Settings file (TOML with [engine] and [connection] sections)
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "CREDSCRIPT_CONFIG",
        default_value = "credscript.toml"
    )]
    pub config: PathBuf,

    /// Run in non-interactive mode (no prompts, suitable for automation)
    #[arg(long, global = true, env = "CREDSCRIPT_NON_INTERACTIVE")]
    pub non_interactive: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_tracing(self.verbose);

        let settings = settings::load(&self.config)?;
        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling");
                    cancel.cancel();
                }
            });
        }

        let ctx = CliContext {
            settings,
            config_path: self.config,
            non_interactive: self.non_interactive,
            cancel,
        };

        let name = self.command.name();
        let result = match self.command {
            Commands::Create(args) => credential::run_create(&ctx, args).await,
            Commands::Update(args) => credential::run_update(&ctx, args).await,
            Commands::Delete(args) => credential::run_delete(&ctx, args).await,
            Commands::Render(args) => render::run(&ctx, args),
            Commands::Params(args) => params::run(&ctx, args),
        };
        result.with_context(|| format!("{} failed", name))
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // Already set elsewhere (tests); keep the existing one.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a username and run the creation statements
    Create(credential::CreateArgs),
    /// Change a user's password (rotates root when it is the root user)
    Update(credential::UpdateArgs),
    /// Run the deletion statements for a user
    Delete(credential::DeleteArgs),
    /// Dry-run: print the rendered script without executing it
    Render(render::RenderArgs),
    /// List root parameters derived from the connection settings
    Params(params::ParamsArgs),
}

impl Commands {
    /// Command name for messages.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Create(_) => "create",
            Commands::Update(_) => "update",
            Commands::Delete(_) => "delete",
            Commands::Render(_) => "render",
            Commands::Params(_) => "params",
        }
    }
}

/// Statement sources shared by the lifecycle commands.
#[derive(Args, Debug, Clone, Default)]
pub struct StatementArgs {
    /// Statement to run (repeatable; runs after any --statements-file lines)
    #[arg(long = "statement", value_name = "STATEMENT")]
    pub statements: Vec<String>,

    /// File with one statement per line (blank lines skipped)
    #[arg(long, value_name = "PATH")]
    pub statements_file: Option<PathBuf>,
}

impl StatementArgs {
    pub fn load(&self) -> Result<Statements> {
        let mut commands = Vec::new();
        if let Some(path) = &self.statements_file {
            let content = fs::read_to_string(path)
                .with_context(|| format!("read statements {}", path.display()))?;
            commands.extend(
                content
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(str::to_string),
            );
        }
        commands.extend(self.statements.iter().cloned());
        Ok(Statements { commands })
    }
}
