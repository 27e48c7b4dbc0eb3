//! gwaudit - Google Workspace and Cloud audit reports
//!
//! Lists projects, users, groups and shared drives, enriches each item with
//! its service accounts, tokens, memberships or permissions, and writes one
//! CSV report per pipeline into a timestamped directory that is zipped and
//! uploaded to Drive.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use cmd::audit::Audit;
use config::Config;
use gwaudit_audit::AuditContext;
use gwaudit_core::ProgressContext;

const LOG_FILE: &str = "gwaudit.log";

#[derive(Parser)]
#[command(name = "gwaudit")]
#[command(about = "Google Workspace and Cloud audit reports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./gwaudit.toml or ~/.config/gwaudit/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// OAuth access token for the Google APIs
    #[arg(long, global = true, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Workspace customer id
    #[arg(long, global = true)]
    customer_id: Option<String>,

    /// Root directory for report runs
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Zip the reports but do not upload the archive
    #[arg(long, global = true)]
    no_upload: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Projects, users and groups reports
    Inventory,
    /// Owners, managers and subscriptions of every group
    Groups,
    /// Permissions of every shared drive
    SharedDrives,
    /// Apps Script projects owned by each user (needs delegated tokens)
    AppsScripts,
    /// One row per (user, token) from a users.csv report
    AnalyzeUsers(cmd::analyze::AnalyzeArgs),
    /// Show current configuration
    Config,
}

impl Command {
    fn audit(&self) -> Option<Audit> {
        match self {
            Self::Inventory => Some(Audit::Inventory),
            Self::Groups => Some(Audit::Groups),
            Self::SharedDrives => Some(Audit::SharedDrives),
            Self::AppsScripts => Some(Audit::AppsScripts),
            Self::AnalyzeUsers(_) | Self::Config => None,
        }
    }
}

/// `<root>/output_<RFC 3339 timestamp>`
fn run_dir(root: &std::path::Path) -> PathBuf {
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    root.join(format!("output_{stamp}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    let reports_root = cli
        .output
        .clone()
        .unwrap_or_else(|| config.output.reports_root.clone());
    let audit = cli.command.audit();
    let reports_dir = run_dir(&reports_root);
    if audit.is_some() {
        std::fs::create_dir_all(&reports_dir)
            .with_context(|| format!("Cannot create {}", reports_dir.display()))?;
    }

    // Progress context (TTY auto-detect)
    let progress = Arc::new(ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug  - progress bars show activity
    //   non-TTY: info unless --debug          - logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    let log_file = audit.map(|_| reports_dir.join(LOG_FILE));
    gwaudit_core::init_logging(quiet, cli.debug, multi, log_file.as_deref())
        .context("Cannot initialize logging")?;
    if let Some(path) = &config.source {
        log::info!("Loaded config from {}", path.display());
    }

    let Some(audit) = audit else {
        return match cli.command {
            Command::AnalyzeUsers(args) => cmd::analyze::run(args),
            _ => {
                print_config(&config, &reports_root);
                Ok(())
            }
        };
    };

    let access_token = cli
        .access_token
        .or_else(|| config.auth.access_token.clone())
        .context(
            "No access token: pass --access-token, set GOOGLE_ACCESS_TOKEN \
             or [auth] access_token in the config file",
        )?;

    log::info!("Writing reports to {}", reports_dir.display());
    let mut ctx = AuditContext::new(reports_dir);
    ctx.customer_id = cli.customer_id.unwrap_or(config.auth.customer_id);
    ctx.batch = config.batch;
    ctx.retry = config.retry;
    ctx.classifier = config.http.classifier;
    ctx.drive_folder = config.output.drive_folder;
    ctx.upload = config.output.upload && !cli.no_upload;
    ctx.progress = progress;

    cmd::audit::run(
        audit,
        ctx,
        &access_token,
        Duration::from_secs(config.http.timeout_secs),
        config.auth.delegated_token_command,
    )
}

fn print_config(config: &Config, reports_root: &std::path::Path) {
    use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let source = config
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    table.add_row(vec!["Config file", &source]);
    table.add_row(vec![
        "Access token",
        if config.auth.access_token.is_some() {
            "configured"
        } else {
            "not set"
        },
    ]);
    table.add_row(vec!["Customer", &config.auth.customer_id]);
    table.add_row(vec![
        "Delegated tokens",
        if config.auth.delegated_token_command.is_empty() {
            "not set"
        } else {
            "command configured"
        },
    ]);
    table.add_row(vec!["Reports root", &reports_root.display().to_string()]);
    table.add_row(vec!["Drive folder", &config.output.drive_folder]);
    table.add_row(vec!["Upload", &config.output.upload.to_string()]);
    table.add_row(vec!["HTTP timeout", &format!("{}s", config.http.timeout_secs)]);
    table.add_row(vec!["Classifier", &format!("{:?}", config.http.classifier)]);

    for (api, policy) in [
        ("directory", config.retry.directory),
        ("resource manager", config.retry.resource_manager),
        ("iam", config.retry.iam),
        ("drive", config.retry.drive),
    ] {
        let quota_cap = policy
            .quota_max_tries
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unbounded".to_string());
        table.add_row(vec![
            format!("Retry ({api})"),
            format!(
                "quota {}s x {quota_cap}, server {}s x {}",
                policy.quota_sleep_secs, policy.server_sleep_secs, policy.max_tries
            ),
        ]);
    }

    let b = &config.batch;
    table.add_row(vec![
        "Batch sizes".to_string(),
        format!(
            "service accounts {}, tokens {}, groups {}, memberships {}, drive permissions {}, \
             user scripts {}",
            b.project_service_accounts,
            b.user_tokens,
            b.group_inventory,
            b.group_memberships,
            b.drive_permissions,
            b.user_scripts
        ),
    ]);

    eprintln!("\n{table}");
}
