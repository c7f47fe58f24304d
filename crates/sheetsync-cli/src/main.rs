//! sheetsync CLI - plan and apply template synchronizations from JSON files

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sheetsync::prelude::*;
use sheetsync::{
    instantiate, rewrite, CellAddress, RandomRuleIds, RewriteRequest, RuleIdGenerator,
    SequentialRuleIds, SheetOffset, SheetTarget,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "sheetsync")]
#[command(
    author,
    version,
    about = "Keep spreadsheet documents in sync with records and templates"
)]
struct Cli {
    /// Engine configuration (JSON); absent fields use defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Use reproducible validation rule ids (dv_00000001, ...)
    #[arg(long, global = true)]
    sequential_ids: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Relocate one formula and print the result
    Rewrite {
        /// Cell content, e.g. "=A1+B2"
        formula: String,

        /// Template cell the formula was written in (A1)
        #[arg(long)]
        origin: String,

        /// Cell it is copied to (A1)
        #[arg(long)]
        dest: String,

        /// Template sheet name
        #[arg(long)]
        origin_sheet: String,

        /// Destination sheet name (default: origin sheet)
        #[arg(long)]
        dest_sheet: Option<String>,

        /// Other sheet names the formula may mention
        #[arg(long = "sheet-name")]
        sheet_names: Vec<String>,
    },

    /// Print the commands instantiating one template sheet
    Instantiate {
        /// Template file (JSON)
        template: PathBuf,

        /// Template sheet id (default: the main sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Destination sheet name (default: the template sheet name)
        #[arg(short, long)]
        name: Option<String>,

        /// Instantiate as an auxiliary sheet, without offset
        #[arg(long)]
        auxiliary: bool,
    },

    /// Print the commands reconciling a document with a record set
    Reconcile {
        /// Templates file (JSON array)
        #[arg(short, long)]
        templates: PathBuf,

        /// Records file (JSON array)
        #[arg(short, long)]
        records: PathBuf,

        /// Current document (JSON, default: empty)
        #[arg(short, long)]
        document: Option<PathBuf>,
    },

    /// Synchronize a document and print (or write) the result
    Sync {
        /// Templates file (JSON array)
        #[arg(short, long)]
        templates: PathBuf,

        /// Records file (JSON array)
        #[arg(short, long)]
        records: PathBuf,

        /// Current document (JSON, default: empty)
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Output document file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the list descriptors of a record set
    Lists {
        /// Records file (JSON array)
        #[arg(short, long)]
        records: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = match &cli.config {
        Some(path) => {
            let text = read(path)?;
            SyncConfig::from_json(&text)
                .with_context(|| format!("Failed to parse config '{}'", path.display()))?
        }
        None => SyncConfig::default(),
    };
    let mut ids: Box<dyn RuleIdGenerator> = if cli.sequential_ids {
        Box::new(SequentialRuleIds::new())
    } else {
        Box::new(RandomRuleIds::new())
    };

    match cli.command {
        Commands::Rewrite {
            formula,
            origin,
            dest,
            origin_sheet,
            dest_sheet,
            sheet_names,
        } => rewrite_formula(
            &formula,
            &origin,
            &dest,
            &origin_sheet,
            dest_sheet.as_deref(),
            &sheet_names,
        ),
        Commands::Instantiate {
            template,
            sheet,
            name,
            auxiliary,
        } => instantiate_sheet(
            &template,
            sheet.as_deref(),
            name.as_deref(),
            auxiliary,
            &config,
            ids.as_mut(),
        ),
        Commands::Reconcile {
            templates,
            records,
            document,
        } => reconcile(&templates, &records, document.as_deref(), &config, ids.as_mut()),
        Commands::Sync {
            templates,
            records,
            document,
            output,
        } => sync(
            &templates,
            &records,
            document.as_deref(),
            output.as_deref(),
            config,
            ids,
        ),
        Commands::Lists { records } => lists(&records, config),
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let layer = if json {
        fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .boxed()
    };
    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .init();
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read(path)?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse '{}'", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).context("Failed to write output")?;
    writeln!(out)?;
    Ok(())
}

fn load_document(path: Option<&Path>) -> Result<Document> {
    match path {
        Some(path) => read_json(path),
        None => Ok(Document::new()),
    }
}

fn load_templates(path: &Path) -> Result<TemplateCatalog> {
    let text = read(path)?;
    TemplateCatalog::from_json(&text)
        .with_context(|| format!("Failed to parse templates '{}'", path.display()))
}

fn rewrite_formula(
    formula: &str,
    origin: &str,
    dest: &str,
    origin_sheet: &str,
    dest_sheet: Option<&str>,
    sheet_names: &[String],
) -> Result<()> {
    let origin =
        CellAddress::parse(origin).with_context(|| format!("Invalid origin cell '{origin}'"))?;
    let dest = CellAddress::parse(dest).with_context(|| format!("Invalid destination cell '{dest}'"))?;
    let request = RewriteRequest {
        origin,
        dest,
        origin_sheet,
        dest_sheet: dest_sheet.unwrap_or(origin_sheet),
        sheet_names,
        main_sheet: None,
    };
    let rewritten = rewrite(formula, &request).context("Failed to rewrite formula")?;
    println!("{rewritten}");
    Ok(())
}

fn instantiate_sheet(
    path: &Path,
    sheet_id: Option<&str>,
    name: Option<&str>,
    auxiliary: bool,
    config: &SyncConfig,
    ids: &mut dyn RuleIdGenerator,
) -> Result<()> {
    let template: Template = read_json(path)?;
    let sheet = match sheet_id {
        Some(id) => match template.sheets.iter().find(|s| s.id == id) {
            Some(sheet) => sheet,
            None => bail!("Template has no sheet '{id}'"),
        },
        None => template.main_sheet().context("Template has no sheets")?,
    };
    let name = sheetsync::sheet_name_for(name.unwrap_or(&sheet.name), &sheet.id);
    let target = SheetTarget {
        sheet_id: &sheet.id,
        name: &name,
        offset: if auxiliary {
            SheetOffset::ZERO
        } else {
            config.line_offset
        },
        auxiliary,
        position: 0,
        main_sheet: None,
    };
    print_json(&instantiate(&template, sheet, &target, config, ids))
}

fn reconcile(
    templates: &Path,
    records: &Path,
    document: Option<&Path>,
    config: &SyncConfig,
    ids: &mut dyn RuleIdGenerator,
) -> Result<()> {
    let catalog = load_templates(templates)?;
    let records: Vec<BackingRecord> = read_json(records)?;
    let document = load_document(document)?;
    let commands = Reconciler::new(config, &catalog).reconcile(&document, &[], &records, ids);
    print_json(&commands)
}

fn sync(
    templates: &Path,
    records: &Path,
    document: Option<&Path>,
    output: Option<&Path>,
    config: SyncConfig,
    ids: Box<dyn RuleIdGenerator>,
) -> Result<()> {
    let catalog = load_templates(templates)?;
    let records: Vec<BackingRecord> = read_json(records)?;
    let session = Arc::new(InMemorySession::with_document(load_document(document)?));
    let synchronizer =
        Synchronizer::new(config, Arc::new(catalog), session.clone()).with_rule_ids(ids);

    match synchronizer.handle(&SyncTrigger::Manual, &records) {
        SyncOutcome::Deferred { reason, .. } => bail!("Synchronization deferred: {reason}"),
        SyncOutcome::Applied {
            revision, commands, ..
        } => eprintln!("Applied {commands} commands (revision {revision})"),
        SyncOutcome::UpToDate => eprintln!("Document already up to date"),
    }

    let document = session.document();
    match output {
        Some(path) => {
            let text = serde_json::to_string_pretty(&document)?;
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            eprintln!("Wrote {} sheets to '{}'", document.sheet_count(), path.display());
            Ok(())
        }
        None => print_json(&document),
    }
}

fn lists(records: &Path, config: SyncConfig) -> Result<()> {
    let records: Vec<BackingRecord> = read_json(records)?;
    let synchronizer = Synchronizer::new(
        config,
        Arc::new(TemplateCatalog::new()),
        Arc::new(InMemorySession::new()),
    );
    print_json(&synchronizer.main_lists(&records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rewrite() {
        let cli = Cli::try_parse_from([
            "sheetsync",
            "rewrite",
            "=A1+B2",
            "--origin",
            "C3",
            "--dest",
            "C7",
            "--origin-sheet",
            "Costing",
            "--sheet-name",
            "Profile Master",
            "--sheet-name",
            "Resin",
        ])
        .unwrap();
        match cli.command {
            Commands::Rewrite {
                origin,
                dest,
                dest_sheet,
                sheet_names,
                ..
            } => {
                assert_eq!(origin, "C3");
                assert_eq!(dest, "C7");
                assert_eq!(dest_sheet, None);
                assert_eq!(sheet_names, vec!["Profile Master", "Resin"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sheetsync",
            "reconcile",
            "-t",
            "templates.json",
            "-r",
            "records.json",
            "--config",
            "sync.json",
            "--log-json",
            "--sequential-ids",
        ])
        .unwrap();
        assert!(cli.log_json);
        assert!(cli.sequential_ids);
        assert_eq!(cli.config, Some(PathBuf::from("sync.json")));
        assert!(matches!(
            cli.command,
            Commands::Reconcile { document: None, .. }
        ));
    }

    #[test]
    fn test_sync_requires_records() {
        assert!(Cli::try_parse_from(["sheetsync", "sync", "-t", "templates.json"]).is_err());
    }

    #[test]
    fn test_read_json_reports_path() {
        let err = read_json::<Document>(Path::new("/nonexistent/document.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/document.json"));
    }
}
