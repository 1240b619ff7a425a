use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::record::VisitPatch;

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

#[derive(Debug, Parser)]
#[command(name = "visit-planner")]
#[command(bin_name = "visit-planner")]
#[command(version)]
#[command(about = "Offline-first field visit planner with Drive backups")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "VISIT_PLANNER_DB_PATH",
        default_value = ".visit-planner/state.sqlite",
        global = true,
        help = "Path to the local SQLite store."
    )]
    pub db: String,

    #[arg(
        short = 'c',
        long,
        env = "VISIT_PLANNER_CONFIG",
        global = true,
        help = "Config file (defaults to .visit-planner/config.toml when present)."
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "VISIT_PLANNER_CLIENT_ID",
        global = true,
        help = "OAuth client id for Drive backups; overrides drive.client_id."
    )]
    pub client_id: Option<String>,

    #[arg(
        long,
        env = "VISIT_PLANNER_LOG",
        default_value = "warn",
        global = true,
        help = "Log filter when RUST_LOG is unset (e.g. info, debug)."
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Record a new visit.")]
    New(NewArgs),
    #[command(about = "Change fields of a saved visit.")]
    Edit(EditArgs),
    #[command(about = "Delete a saved visit.")]
    Rm(RmArgs),
    #[command(about = "List saved visits, newest first.")]
    Ls(ListArgs),
    #[command(about = "Show one visit as a worksheet.")]
    Show(ShowArgs),
    #[command(about = "Write every visit to a JSON backup file.")]
    Export(ExportArgs),
    #[command(about = "Merge visits from a JSON backup file.")]
    Import(ImportArgs),
    #[command(about = "Upload a backup of all visits to Google Drive.")]
    Sync(SyncArgs),
    #[command(about = "Show connectivity and the last Drive sync.")]
    Status(StatusArgs),
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

/// One flag per worksheet field. Omitted flags leave the field untouched.
#[derive(Debug, Default, Args)]
pub struct VisitFieldArgs {
    #[arg(short = 'n', long = "customer", help = "Customer name.")]
    pub customer_name: Option<String>,

    #[arg(short = 'l', long, help = "Plant location.")]
    pub location: Option<String>,

    #[arg(long, help = "Contact person.")]
    pub contact: Option<String>,

    #[arg(long, help = "Visit date (defaults to today for new visits).")]
    pub date: Option<String>,

    #[arg(long, help = "Machines running.")]
    pub machines: Option<String>,

    #[arg(long, help = "Product made.")]
    pub product: Option<String>,

    #[arg(long, help = "Current tooling.")]
    pub tooling: Option<String>,

    #[arg(long = "blade-change", help = "Blade change interval.")]
    pub blade_change_interval: Option<String>,

    #[arg(long = "grind", help = "Grind interval.")]
    pub grind_interval: Option<String>,

    #[arg(long, help = "Known issues.")]
    pub issues: Option<String>,

    #[arg(long = "slitter", help = "Slitter tooling opportunity.")]
    pub slitter_tooling: Option<String>,

    #[arg(long = "cutoff", help = "Cutoff tooling opportunity.")]
    pub cutoff_tooling: Option<String>,

    #[arg(long = "perf", help = "Perforation tooling opportunity.")]
    pub perf_tooling: Option<String>,

    #[arg(long = "grinding-systems", help = "Grinding systems opportunity.")]
    pub grinding_systems: Option<String>,

    #[arg(short = 'g', long, help = "Visit goal.")]
    pub goal: Option<String>,

    #[arg(long = "next-step", help = "Agreed next step.")]
    pub next_step: Option<String>,
}

impl VisitFieldArgs {
    pub fn into_patch(self) -> VisitPatch {
        VisitPatch {
            customer_name: self.customer_name,
            location: self.location,
            contact: self.contact,
            date: self.date,
            machines: self.machines,
            product: self.product,
            tooling: self.tooling,
            blade_change_interval: self.blade_change_interval,
            grind_interval: self.grind_interval,
            issues: self.issues,
            slitter_tooling: self.slitter_tooling,
            cutoff_tooling: self.cutoff_tooling,
            perf_tooling: self.perf_tooling,
            grinding_systems: self.grinding_systems,
            goal: self.goal,
            next_step: self.next_step,
        }
    }
}

#[derive(Debug, Args)]
pub struct NewArgs {
    #[command(flatten)]
    pub fields: VisitFieldArgs,

    #[arg(long, help = "Render as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    #[arg(help = "Visit id.")]
    pub id: String,

    #[command(flatten)]
    pub fields: VisitFieldArgs,

    #[arg(long, help = "Render as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RmArgs {
    #[arg(help = "Visit id.")]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(help = "Case-insensitive filter on customer name and location.")]
    pub query: Option<String>,

    #[arg(long, help = "Render as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(help = "Visit id.")]
    pub id: String,

    #[arg(long, help = "Render as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(
        short = 'o',
        long,
        help = "Output path (defaults to VisitPlanner_Backup.json)."
    )]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[arg(help = "Backup file holding a JSON array of visits.")]
    pub file: PathBuf,

    #[arg(long, help = "Render as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[arg(
        long,
        env = "VISIT_PLANNER_OFFLINE",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new(),
        help = "Treat the network as unavailable."
    )]
    pub offline: bool,

    #[arg(
        long,
        env = "VISIT_PLANNER_ACCESS_TOKEN",
        hide_env_values = true,
        help = "Drive access token; skips the interactive sign-in prompt."
    )]
    pub access_token: Option<String>,

    #[arg(long, help = "Render as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(
        long,
        env = "VISIT_PLANNER_OFFLINE",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new(),
        help = "Treat the network as unavailable."
    )]
    pub offline: bool,

    #[arg(long, help = "Render as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish). Auto-detected if omitted.")]
    pub shell: Option<String>,

    #[arg(
        short = 'i',
        long = "install",
        help = "Write completions to the canonical path for the shell."
    )]
    pub install: bool,
}
