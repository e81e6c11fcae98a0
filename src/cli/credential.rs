use crate::cli::{CliContext, StatementArgs};
use crate::constants;
use crate::core::database::Database;
use crate::core::settings;
use crate::models::request::{
    ChangePassword, CredentialType, DeleteUserRequest, NewUserRequest, Statements,
    UpdateUserRequest, UsernameConfig,
};
use crate::util::secret::{self, PasswordSource};
use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct PasswordArgs {
    /// Read the password from stdin instead of an interactive prompt
    #[arg(long)]
    pub from_stdin: bool,

    /// Generate a random password (printed once on success)
    #[arg(long)]
    pub auto: bool,

    /// Length for a generated password
    #[arg(long, default_value_t = constants::DEFAULT_AUTO_PASSWORD_LENGTH)]
    pub length: usize,
}

impl PasswordArgs {
    fn source(&self) -> Result<PasswordSource> {
        PasswordSource::from_flags(self.from_stdin, self.auto, self.length)
    }
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Display name folded into the generated username
    #[arg(long, default_value = "")]
    pub display_name: String,

    /// Role name folded into the generated username
    #[arg(long, default_value = "")]
    pub role_name: String,

    #[command(flatten)]
    pub statements: StatementArgs,

    /// Rollback statement (accepted for host compatibility, never executed)
    #[arg(long = "rollback-statement", value_name = "STATEMENT")]
    pub rollback_statements: Vec<String>,

    #[command(flatten)]
    pub password: PasswordArgs,

    /// Output format: text|json
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Existing username
    pub username: String,

    #[command(flatten)]
    pub statements: StatementArgs,

    #[command(flatten)]
    pub password: PasswordArgs,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Existing username
    pub username: String,

    #[command(flatten)]
    pub statements: StatementArgs,
}

#[derive(Serialize)]
struct CreateOutput<'a> {
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

fn check_format(format: &str) -> Result<()> {
    if format != "text" && format != "json" {
        bail!("invalid format: {} (use text|json)", format);
    }
    Ok(())
}

fn require_statements(statements: &Statements, action: &str) -> Result<()> {
    if statements.is_empty() {
        bail!(
            "{} needs at least one --statement or a --statements-file",
            action
        );
    }
    Ok(())
}

pub async fn run_create(ctx: &CliContext, args: CreateArgs) -> Result<()> {
    check_format(&args.format)?;
    let statements = args.statements.load()?;
    require_statements(&statements, "create")?;

    let source = args.password.source()?;
    let label = format!("new {} user", args.role_name);
    let password = secret::obtain_password(source, ctx.non_interactive, &label)?;

    let db = ctx.engine().await?;
    let req = NewUserRequest {
        username_config: UsernameConfig {
            display_name: args.display_name,
            role_name: args.role_name,
        },
        credential_type: CredentialType::Password,
        password: password.clone(),
        statements,
        rollback_statements: Statements::new(args.rollback_statements),
        expiration: None,
    };
    let resp = db
        .new_user(req, &ctx.cancel)
        .await
        .context("create credential")?;
    db.close().await?;

    let generated = matches!(source, PasswordSource::Generate(_));
    let out = CreateOutput {
        username: &resp.username,
        password: generated.then_some(password.as_str()),
    };
    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&out).context("serialize output")?);
    } else {
        println!("username: {}", out.username);
        if let Some(pw) = out.password {
            println!("password: {}", pw);
        }
    }
    Ok(())
}

pub async fn run_update(ctx: &CliContext, args: UpdateArgs) -> Result<()> {
    let statements = args.statements.load()?;
    require_statements(&statements, "update")?;

    let source = args.password.source()?;
    let password = secret::obtain_password(source, ctx.non_interactive, &args.username)?;

    let db = ctx.engine().await?;
    let req = UpdateUserRequest {
        username: args.username.clone(),
        credential_type: CredentialType::Password,
        password: Some(ChangePassword {
            new_password: password.clone(),
            statements,
        }),
        expiration: None,
    };
    db.update_user(req, &ctx.cancel)
        .await
        .with_context(|| format!("update credential {}", args.username))?;
    let rotated = db.inner().store().root_username().as_deref() == Some(args.username.as_str());
    db.close().await?;

    println!("Updated {}", args.username);
    if matches!(source, PasswordSource::Generate(_)) {
        println!("password: {}", password.as_str());
    }
    if rotated {
        persist_root_password(ctx, &password)?;
        println!("Root password rotated; saved to {}", ctx.config_path.display());
    }
    Ok(())
}

/// Later runs start from the settings file, so a rotated root password must
/// land there or the next script renders the stale one.
fn persist_root_password(ctx: &CliContext, password: &str) -> Result<()> {
    let mut updated = ctx.settings.clone();
    updated.set_root_password(password);
    settings::save(&ctx.config_path, &updated).with_context(|| {
        format!(
            "root password was rotated but could not be saved to {}",
            ctx.config_path.display()
        )
    })
}

pub async fn run_delete(ctx: &CliContext, args: DeleteArgs) -> Result<()> {
    let statements = args.statements.load()?;
    require_statements(&statements, "delete")?;

    let db = ctx.engine().await?;
    let req = DeleteUserRequest {
        username: args.username.clone(),
        statements,
    };
    db.delete_user(req, &ctx.cancel)
        .await
        .with_context(|| format!("delete credential {}", args.username))?;
    db.close().await?;

    println!("Deleted {}", args.username);
    Ok(())
}
