//! Dry-run preview of a lifecycle script.

use crate::cli::{CliContext, StatementArgs};
use crate::constants;
use crate::core::params::{root_key, ParameterStore};
use crate::core::template;
use crate::core::username::UsernameGenerator;
use crate::models::params::Parameters;
use anyhow::{bail, Result};
use clap::{Args, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderAction {
    Create,
    Update,
    Delete,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Lifecycle action whose parameters are used
    #[arg(value_enum)]
    pub action: RenderAction,

    /// Target username (generated for create when omitted)
    #[arg(long)]
    pub username: Option<String>,

    /// Display name for a generated username
    #[arg(long, default_value = "")]
    pub display_name: String,

    /// Role name for a generated username
    #[arg(long, default_value = "")]
    pub role_name: String,

    #[command(flatten)]
    pub statements: StatementArgs,

    /// Output format (text|json)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Rendered preview. Passwords appear as the redaction placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub username: String,
    pub rendered: String,
    pub unresolved: Vec<String>,
}

pub fn run(ctx: &CliContext, args: RenderArgs) -> Result<()> {
    if args.format != "text" && args.format != "json" {
        bail!("invalid format: {} (use text|json)", args.format);
    }
    let statements = args.statements.load()?;
    let store = ParameterStore::new();
    store.load(&ctx.settings.raw_config()?)?;

    let preview = preview(&store, &args, &statements.commands)?;

    if args.format == "json" {
        let plan = serde_json::json!({
            "action": format!("{:?}", args.action).to_lowercase(),
            "username": preview.username,
            "rendered": preview.rendered,
            "unresolved": preview.unresolved,
        });
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("Render: {:?} '{}'", args.action, preview.username);
        println!("---");
        println!("{}", preview.rendered);
        println!("---");
        if preview.unresolved.is_empty() {
            println!("  all placeholders resolved");
        } else {
            for key in &preview.unresolved {
                println!("  [WARN] unresolved placeholder: {{{{{}}}}}", key);
            }
        }
    }
    Ok(())
}

pub fn preview(store: &ParameterStore, args: &RenderArgs, statements: &[String]) -> Result<Preview> {
    let username = match (&args.username, args.action) {
        (Some(u), _) => u.clone(),
        (None, RenderAction::Create) => {
            UsernameGenerator::new().generate(&args.display_name, &args.role_name)?
        }
        (None, action) => bail!("--username is required to render {:?}", action),
    };

    let mut root = store.derive_parameters();
    root.insert(
        root_key(constants::CONFIG_PASSWORD),
        constants::PASSWORD_PLACEHOLDER,
    );

    let mut per_call: Parameters = [("name", username.as_str()), ("username", username.as_str())]
        .into_iter()
        .collect();
    if args.action != RenderAction::Delete {
        per_call.insert(constants::CONFIG_PASSWORD, constants::PASSWORD_PLACEHOLDER);
    }

    let script = template::join_statements(statements);
    let params = Parameters::merge(&per_call, &root);
    Ok(Preview {
        rendered: template::render(&script, &params),
        unresolved: template::unresolved(&script, &params),
        username,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> ParameterStore {
        let store = ParameterStore::new();
        store
            .load(json!({"username": "root", "password": "rootpw", "host": "db1"}).as_object().unwrap())
            .unwrap();
        store
    }

    fn args(action: RenderAction, username: Option<&str>) -> RenderArgs {
        RenderArgs {
            action,
            username: username.map(str::to_string),
            display_name: "app".into(),
            role_name: "svc".into(),
            statements: StatementArgs::default(),
            format: "text".into(),
        }
    }

    #[test]
    fn test_preview_delete_exact() {
        let p = preview(
            &store(),
            &args(RenderAction::Delete, Some("svc_123")),
            &["DROP USER {{username}};".to_string()],
        )
        .unwrap();
        assert_eq!(p.rendered, "DROP USER svc_123;");
        assert!(p.unresolved.is_empty());
    }

    #[test]
    fn test_preview_masks_passwords() {
        let p = preview(
            &store(),
            &args(RenderAction::Update, Some("root")),
            &["psql -h {{root_host}} -U {{root_username}} -W {{root_password}} -c \"ALTER USER {{username}} PASSWORD '{{password}}'\"".to_string()],
        )
        .unwrap();
        assert!(!p.rendered.contains("rootpw"));
        assert!(p.rendered.contains("-h db1 -U root -W [password]"));
        assert!(p.rendered.contains("PASSWORD '[password]'"));
    }

    #[test]
    fn test_preview_delete_has_no_password_param() {
        let p = preview(
            &store(),
            &args(RenderAction::Delete, Some("svc")),
            &["echo {{password}}".to_string()],
        )
        .unwrap();
        assert_eq!(p.rendered, "echo {{password}}");
        assert_eq!(p.unresolved, vec!["password"]);
    }

    #[test]
    fn test_preview_generates_username_for_create() {
        let p = preview(&store(), &args(RenderAction::Create, None), &["{{username}}".to_string()])
            .unwrap();
        assert!(p.username.starts_with("v-app-svc-"));
        assert_eq!(p.rendered, p.username);
    }

    #[test]
    fn test_preview_requires_username_for_update() {
        assert!(preview(&store(), &args(RenderAction::Update, None), &[]).is_err());
    }
}
