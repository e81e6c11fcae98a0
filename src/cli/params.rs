//! Listing of the root parameters scripts can reference.

use crate::cli::CliContext;
use crate::constants;
use crate::core::executor::env_name;
use crate::core::params::{root_key, ParameterStore};
use anyhow::{bail, Context, Result};
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// Output format: table|json
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ParamItem {
    pub placeholder: String,
    pub env: String,
    pub value: String,
}

pub fn run(ctx: &CliContext, args: ParamsArgs) -> Result<()> {
    if args.format != "table" && args.format != "json" {
        bail!("invalid format: {} (use table|json)", args.format);
    }
    let store = ParameterStore::new();
    store.load(&ctx.settings.raw_config()?)?;
    let items = list(&store);

    if args.format == "json" {
        let json = serde_json::to_string_pretty(&items).context("serialize parameters")?;
        println!("{}", json);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Placeholder").add_attribute(Attribute::Bold),
        Cell::new("Environment").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);
    for item in items {
        table.add_row(vec![item.placeholder, item.env, item.value]);
    }
    println!("{}", table);
    Ok(())
}

/// Root parameters with the password masked and an empty value shown as `-`.
pub fn list(store: &ParameterStore) -> Vec<ParamItem> {
    let password_key = root_key(constants::CONFIG_PASSWORD);
    let params = store.derive_parameters();
    let mut items = Vec::with_capacity(params.len());
    for (key, value) in params.iter() {
        let shown = if key == password_key && !value.is_empty() {
            constants::PASSWORD_PLACEHOLDER.to_string()
        } else if value.is_empty() {
            "-".to_string()
        } else {
            value.to_string()
        };
        items.push(ParamItem {
            placeholder: format!("{{{{{}}}}}", key),
            env: env_name(key).unwrap_or_default(),
            value: shown,
        });
    }
    items
}
