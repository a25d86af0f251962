use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

use crate::app::AppState;
use crate::application::ExportFormat;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMProvider;
use crate::domain::master::{ImportCategory, ImportResult, OptionCategory};
use crate::domain::report::{Report, ReportSelection};
use crate::infrastructure::config::{AppConfig, ConfigService};

/// Regulation report generator.
///
/// Imports countries, regulations and prompt templates, asks a language model
/// for a table and exports the result as CSV, Excel or TSV.
#[derive(Parser, Debug)]
#[command(name = "regreport", version, about)]
pub struct Cli {
    /// Config file (defaults to ./regreport.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upsert master data from the config source.
    Import {
        /// countries, regulations or templates. Imports all three when omitted.
        category: Option<ImportCategory>,
        /// Directory with countries.csv, regulations.csv and templates.csv.
        #[arg(long, conflicts_with = "workbook")]
        dir: Option<PathBuf>,
        /// Workbook with countries, regulations and templates sheets.
        #[arg(long)]
        workbook: Option<PathBuf>,
    },
    /// List selectable countries or regulations.
    Options {
        category: OptionCategory,
        /// Group by the imported group label (e.g. continent).
        #[arg(long)]
        grouped: bool,
    },
    /// Show the prompt a selection resolves to without generating anything.
    Preview(SelectionArgs),
    /// Generate a report for a selection.
    Generate(SelectionArgs),
    /// List reports, newest first.
    Reports,
    /// Show one report with its table or failure reason.
    Show { report_id: String },
    /// Write a complete report to a file.
    Export {
        report_id: String,
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
        /// Target file or directory. Defaults to report_<id>.<ext> in the working directory.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Manage backend API keys in the OS keyring.
    #[command(subcommand)]
    Key(KeyCommand),
}

#[derive(clap::Args, Debug)]
pub struct SelectionArgs {
    /// Country code, e.g. JP.
    pub country: String,
    /// Regulation code, e.g. GDPR.
    pub regulation: String,
    /// Free text passed to the template as {{user_input}}.
    #[arg(long, short, default_value = "")]
    pub input: String,
}

impl SelectionArgs {
    fn selection(&self) -> ReportSelection {
        ReportSelection::new(&self.country, &self.regulation, &self.input)
    }
}

#[derive(Subcommand, Debug)]
pub enum KeyCommand {
    /// Store an API key for a provider.
    Set { provider: LLMProvider, key: String },
    /// Remove a stored API key.
    Delete { provider: LLMProvider },
}

pub async fn execute(cli: Cli, mut config: AppConfig) -> Result<()> {
    let json = cli.json;

    // Key management never needs the database.
    if let Commands::Key(command) = &cli.command {
        let service = ConfigService::new();
        return match command {
            KeyCommand::Set { provider, key } => {
                service.save_api_key(*provider, key)?;
                println!("Stored API key for {}", provider.keyring_account());
                Ok(())
            }
            KeyCommand::Delete { provider } => {
                service.delete_api_key(*provider)?;
                println!("Removed API key for {}", provider.keyring_account());
                Ok(())
            }
        };
    }

    if let Commands::Import { dir, workbook, .. } = &cli.command {
        if let Some(dir) = dir {
            config.import.config_dir = dir.clone();
            config.import.workbook = None;
        }
        if let Some(workbook) = workbook {
            config.import.workbook = Some(workbook.clone());
        }
    }

    let state = AppState::bootstrap(config).await?;
    let outcome = dispatch(&state, cli.command, json).await;
    state.shutdown().await;
    outcome
}

async fn dispatch(state: &AppState, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Import { category, .. } => {
            let categories = match category {
                Some(category) => vec![category],
                None => ImportCategory::ALL.to_vec(),
            };
            let mut results = Vec::new();
            for category in categories {
                let result = state.importer.import_from_source(category).await?;
                results.push(ImportSummary { category, result });
            }
            if json {
                print_json(&results)?;
            } else {
                for summary in &results {
                    print_import(summary);
                }
            }
        }
        Commands::Options { category, grouped } => {
            if grouped {
                let groups = state.catalog.options_grouped(category).await?;
                if json {
                    print_json(&groups)?;
                } else {
                    for group in groups {
                        println!("{}", group.name);
                        for option in group.options {
                            println!("  {}\t{}", option.code, option.label);
                        }
                    }
                }
            } else {
                let options = state.catalog.options(category).await?;
                if json {
                    print_json(&options)?;
                } else {
                    for option in options {
                        println!("{}\t{}", option.code, option.label);
                    }
                }
            }
        }
        Commands::Preview(args) => {
            let preview = state.preview.execute(&args.selection()).await?;
            if json {
                print_json(&preview)?;
            } else {
                println!("# template: {}", preview.template_name);
                println!("# columns: {}", preview.columns.join(", "));
                println!("{}", preview.prompt_text);
            }
        }
        Commands::Generate(args) => match state.generate.execute(args.selection()).await {
            Ok(report) => {
                if json {
                    print_json(&report)?;
                } else {
                    print_report(&report);
                }
            }
            Err(AppError::ReportFailed { report_id, cause }) => {
                warn!(report_id = %report_id, "Generation did not produce a usable table");
                return Err(AppError::ReportFailed { report_id, cause });
            }
            Err(err) => return Err(err),
        },
        Commands::Reports => {
            let listing = state.reports.list().await?;
            if json {
                print_json(&listing)?;
            } else {
                for summary in &listing.reports {
                    println!(
                        "{}\t{}\t{}/{}\t{}\t{}",
                        summary.id,
                        summary.created_at.format("%Y-%m-%d %H:%M:%S"),
                        summary.country_code,
                        summary.regulation_code,
                        summary.status,
                        summary
                            .row_count
                            .map(|n| format!("{} rows", n))
                            .unwrap_or_default()
                    );
                }
                if listing.has_pending() {
                    println!("(some reports are still generating)");
                }
            }
        }
        Commands::Show { report_id } => {
            let report = state.reports.get(&report_id).await?;
            if json {
                print_json(&report)?;
            } else {
                print_report(&report);
            }
        }
        Commands::Export {
            report_id,
            format,
            output,
        } => {
            let file = state.export.execute(&report_id, format).await?;
            let path = match output {
                Some(path) if path.is_dir() => path.join(&file.file_name),
                Some(path) => path,
                None => PathBuf::from(&file.file_name),
            };
            std::fs::write(&path, &file.bytes).map_err(|e| {
                AppError::IoError(format!("Failed to write {}: {}", path.display(), e))
            })?;
            println!("{} ({}, {} bytes)", path.display(), file.mime_type, file.bytes.len());
        }
        Commands::Key(_) => {
            return Err(AppError::Internal(
                "key commands are handled before bootstrap".to_string(),
            ))
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct ImportSummary {
    category: ImportCategory,
    #[serde(flatten)]
    result: ImportResult,
}

fn print_import(summary: &ImportSummary) {
    let result = &summary.result;
    println!(
        "{}: {} inserted, {} updated, {} rejected",
        summary.category,
        result.inserted,
        result.updated,
        result.rejected.len()
    );
    for rejected in &result.rejected {
        println!("  line {}: {}", rejected.line, rejected.reason);
    }
}

fn print_report(report: &Report) {
    println!("id:        {}", report.id);
    println!("created:   {}", report.created_at.to_rfc3339());
    println!(
        "selection: {}/{} ({})",
        report.selection.country_code, report.selection.regulation_code, report.template_name
    );
    println!("status:    {}", report.status);
    if let Some(reason) = &report.failure_reason {
        println!("reason:    {}", reason);
    }
    if let Some(table) = &report.table {
        println!();
        println!("{}", table.columns().join("\t"));
        // Stored cells are escaped, so each row stays on one line.
        for row in table.rows() {
            println!("{}", row.join("\t"));
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Internal(format!("Failed to encode output: {}", e)))?;
    println!("{}", text);
    Ok(())
}
