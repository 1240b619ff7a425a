mod app;
mod cache;
mod cli;
mod codec;
mod completions;
mod config;
mod db;
mod logging;
mod record;
mod store;
mod sync;
mod ui;

use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = ".visit-planner/config.toml";

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), app::AppError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();
    logging::init(&cli.log_level);

    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell.as_deref(), args.install);
    }

    let drive = load_drive_settings(cli.config.as_deref(), cli.client_id.clone())?;
    let mut app = app::App::open(&cli.db, drive)?;

    match cli.command {
        Commands::New(args) => {
            let visit = app.create_visit(&args.fields.into_patch())?;
            if args.json {
                print_json(&visit);
            } else {
                ui::print_saved(&visit);
            }
        }
        Commands::Edit(args) => {
            let visit = app.update_visit(&args.id, &args.fields.into_patch())?;
            if args.json {
                print_json(&visit);
            } else {
                ui::print_saved(&visit);
            }
        }
        Commands::Rm(args) => {
            if app.delete_visit(&args.id)? {
                println!("deleted {}", args.id);
            } else {
                println!("no visit {}; nothing deleted", args.id);
            }
        }
        Commands::Ls(args) => {
            let visits = app.list_visits(args.query.as_deref().unwrap_or(""));
            if args.json {
                print_json(&visits);
            } else {
                ui::print_visit_list(&visits, app.visit_count());
            }
        }
        Commands::Show(args) => {
            let visit = app
                .show_visit(&args.id)
                .ok_or_else(|| app::AppError::NotFound(args.id.clone()))?;
            if args.json {
                print_json(visit);
            } else {
                ui::print_worksheet(visit);
            }
        }
        Commands::Export(args) => {
            let out = args.out.unwrap_or_else(app::default_export_path);
            let summary = app.export_backup(&out)?;
            println!(
                "exported {} visit(s) to {}",
                summary.records,
                summary.path.display()
            );
        }
        Commands::Import(args) => {
            let summary = app.import_backup(&args.file)?;
            if args.json {
                print_json(&summary);
            } else {
                ui::print_import_summary(&summary);
            }
        }
        Commands::Sync(args) => {
            let settings = app.drive_settings().clone();
            let connectivity = sync::Connectivity::detect(args.offline, &settings.api_base_url)?;
            let backup = sync::BackupSync::new(
                sync::HttpDriveApi::new(&settings.api_base_url, &settings.upload_base_url),
                settings.folder_name.as_str(),
                settings.file_name.as_str(),
            );
            let mut provider: Box<dyn sync::TokenProvider> = match args.access_token {
                Some(token) => Box::new(sync::StaticTokenProvider::new(Some(token))),
                None => Box::new(sync::PromptTokenProvider::new(
                    settings.redirect_uri.as_str(),
                )),
            };
            let outcome = app.sync_drive(&backup, provider.as_mut(), connectivity)?;
            if args.json {
                print_json(&outcome);
            } else {
                ui::print_sync_outcome(&outcome);
            }
        }
        Commands::Status(args) => {
            let connectivity =
                sync::Connectivity::detect(args.offline, &app.drive_settings().api_base_url)?;
            let last_sync = app.last_sync()?;
            if args.json {
                print_json(&serde_json::json!({
                    "connectivity": connectivity.to_string(),
                    "banner": connectivity.banner(),
                    "last_drive_sync": last_sync,
                    "visits": app.visit_count(),
                }));
            } else {
                ui::print_status(connectivity, last_sync.as_deref());
            }
        }
        // Handled before the store is opened.
        Commands::Completions(_) => {}
    }

    app.close()
}

fn load_drive_settings(
    explicit: Option<&Path>,
    client_id: Option<String>,
) -> Result<config::DriveSettings, config::ConfigError> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let file = config::load_config_file(&path, explicit.is_some())?;
    Ok(config::DriveSettings::resolve(file, client_id))
}
