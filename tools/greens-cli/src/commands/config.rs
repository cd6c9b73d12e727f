//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::generate_default_config;
use crate::context::{Context, TOKEN_ENV};

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { force } => init_config(force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    let api = &ctx.config.api;
    ctx.output.info("");
    ctx.output.info("[api]");
    ctx.output.kv("base_url", &api.base_url);
    ctx.output.kv("currency", api.currency.code());
    ctx.output.kv("connect_timeout_ms", &api.connect_timeout_ms.to_string());
    ctx.output.kv("request_timeout_ms", &api.request_timeout_ms.to_string());
    ctx.output.kv("max_retries", &api.max_retries.to_string());
    let statuses: Vec<String> = api.retry_statuses.iter().map(u16::to_string).collect();
    ctx.output.kv("retry_statuses", &statuses.join(", "));

    ctx.output.info("");
    ctx.output.info("[voucher]");
    ctx.output
        .kv("latency_ms", &ctx.config.voucher.latency_ms.to_string());
    let codes: Vec<String> = ctx
        .config
        .voucher_book()?
        .rules()
        .iter()
        .map(|r| r.code.clone())
        .collect();
    ctx.output.kv("codes", &codes.join(", "));

    if let Some(profile) = &ctx.config.profile {
        ctx.output.info("");
        ctx.output.info("[profile]");
        ctx.output.kv("name", &profile.name);
        ctx.output.kv("email", &profile.email);
        ctx.output.kv("role", profile.role.as_str());
    }

    ctx.output.info("");
    let token = if std::env::var_os(TOKEN_ENV).is_some() {
        "set"
    } else {
        "not set"
    };
    ctx.output.kv(TOKEN_ENV, token);
    ctx.output.kv("mode", if ctx.is_offline() { "offline" } else { "online" });

    Ok(())
}

fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join("greens.toml");

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, generate_default_config())?;
    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    // Loading the context already rejected invalid files.
    match &ctx.config_path {
        Some(path) => ctx
            .output
            .success(&format!("{} is valid", path.display())),
        None => ctx
            .output
            .warn("No config file found, using defaults. Run `greens config init` to create one."),
    }
    Ok(())
}
