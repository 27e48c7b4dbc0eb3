//! analyze-users subcommand - expand a users report into token rows

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use gwaudit_audit::records::TokenRow;
use gwaudit_audit::{Report, analyze_users};
use gwaudit_core::fmt_num;

use super::print_summary;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// users.csv written by a previous inventory run
    pub input: PathBuf,

    /// Output CSV
    #[arg(short, long, default_value = TokenRow::FILE_NAME)]
    pub out: PathBuf,
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    log::info!("Analyzing {}", args.input.display());
    let summary = analyze_users(&args.input, &args.out)?;

    print_summary(
        "Token analysis",
        &[
            ("Input".to_string(), args.input.display().to_string()),
            ("Output".to_string(), summary.report.display().to_string()),
            ("Tokens".to_string(), fmt_num(summary.rows)),
            (
                "Unreadable users".to_string(),
                fmt_num(summary.failed_items),
            ),
            (
                "Time".to_string(),
                format!("{:.1}s", summary.elapsed.as_secs_f64()),
            ),
        ],
    );
    Ok(())
}
