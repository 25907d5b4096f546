// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{anyhow, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;

use warehouse_auditor::{
    load_inventory, load_reference_tables, logging, AnnotatedTable, AuditConfig, AuditReport,
    BatchAuditor, ConfigManager, Mode, ReferenceRepository, Table,
};

const USAGE: &str = "\
Usage:
  warehouse-auditor audit <inventory> [--control <xlsx>] [--mode normative|operational|both]
                                      [--output <csv>] [--json <file>]
  warehouse-auditor view <inventory> [--control <xlsx>]
  warehouse-auditor config [--init]";

// ============================================================================
// ARGUMENTS
// ============================================================================

struct CliArgs {
    command: String,
    positional: Vec<String>,
    options: Vec<(String, Option<String>)>,
}

impl CliArgs {
    fn parse(args: &[String]) -> Self {
        let command = args.get(1).cloned().unwrap_or_default();
        let mut positional = Vec::new();
        let mut options = Vec::new();

        let mut iter = args.iter().skip(2).peekable();
        while let Some(arg) = iter.next() {
            if arg.starts_with("--") {
                let value = match iter.peek() {
                    Some(next) if !next.starts_with("--") => iter.next().cloned(),
                    _ => None,
                };
                options.push((arg.clone(), value));
            } else {
                positional.push(arg.clone());
            }
        }

        CliArgs {
            command,
            positional,
            options,
        }
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.as_deref())
    }

    fn has(&self, name: &str) -> bool {
        self.options.iter().any(|(k, _)| k == name)
    }

    fn inventory(&self) -> Result<PathBuf> {
        self.positional
            .first()
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("missing inventory file\n\n{}", USAGE))
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let cli = CliArgs::parse(&args);

    match cli.command.as_str() {
        "audit" => run_audit(&cli),
        "view" => run_ui_mode(&cli),
        "config" => run_config(&cli),
        _ => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

// ============================================================================
// SHARED LOADING
// ============================================================================

struct Session {
    config: AuditConfig,
    repo: ReferenceRepository,
    inventory: Table,
}

fn load_session(cli: &CliArgs) -> Result<Session> {
    let manager = ConfigManager::new(ConfigManager::default_path());
    let mut config = manager.load()?;

    if let Some(control) = cli.value("--control") {
        config.control_workbook = PathBuf::from(control);
    }

    // Reference data first: nothing is evaluated against incomplete control tables
    let reference = load_reference_tables(&config)?;
    let repo = ReferenceRepository::load(&reference, config.widths)?;
    let inventory = load_inventory(&cli.inventory()?, &config)?;

    Ok(Session {
        config,
        repo,
        inventory,
    })
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_audit(cli: &CliArgs) -> Result<()> {
    logging::init();

    let modes = match cli.value("--mode").unwrap_or("both") {
        "normative" => vec![Mode::Normative],
        "operational" => vec![Mode::Operational],
        "both" => vec![Mode::Normative, Mode::Operational],
        other => return Err(anyhow!("unknown mode: {} (normative|operational|both)", other)),
    };

    println!("🏭 Warehouse Auditor v{}", warehouse_auditor::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let session = load_session(cli)?;
    println!(
        "✓ Reference data: {} materials, {} combinations",
        session.repo.material_count(),
        session.repo.combination_count()
    );
    println!("✓ Inventory: {} rows", session.inventory.row_count());

    let auditor = BatchAuditor::new().with_workers(session.config.workers);
    let mut results = Vec::new();

    for mode in &modes {
        let table = auditor.audit(&session.inventory, &session.repo, *mode)?;
        print_tally(&table);
        results.push(table);
    }

    if let Some(output) = cli.value("--output") {
        let output = Path::new(output);
        for table in &results {
            let path = output_path(output, table.mode, results.len() > 1);
            table.write_csv_path(&path)?;
            println!("💾 {} results written to {:?}", table.mode.name(), path);
        }
    }

    if let Some(json) = cli.value("--json") {
        let refs: Vec<&AnnotatedTable> = results.iter().collect();
        AuditReport::new(&refs).write_json(Path::new(json))?;
        println!("💾 JSON report written to {}", json);
    }

    info!("audit complete");
    Ok(())
}

fn print_tally(table: &AnnotatedTable) {
    println!("\n📊 {} audit - summary", table.mode.name());
    for (status, count) in table.tally.entries() {
        println!("   {} {:<30} {:>6}", status.glyph(), status.label(), count);
    }
    println!("   {:<33} {:>6}", "Total", table.tally.total());
}

/// With more than one mode, each mode gets its own file: `out_normative.csv`, ...
fn output_path(base: &Path, mode: Mode, per_mode: bool) -> PathBuf {
    if !per_mode {
        return base.to_path_buf();
    }

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audit".to_string());
    let ext = base
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "csv".to_string());

    base.with_file_name(format!("{}_{}.{}", stem, mode.name().to_lowercase(), ext))
}

fn run_config(cli: &CliArgs) -> Result<()> {
    let manager = ConfigManager::new(ConfigManager::default_path());

    if cli.has("--init") {
        manager.save(&AuditConfig::default())?;
        println!("✓ Default config written to {:?}", manager.path());
        return Ok(());
    }

    let config = manager.load()?;
    println!("# {:?}", manager.path());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(cli: &CliArgs) -> Result<()> {
    println!("🖥️  Loading Warehouse Auditor UI...\n");

    let session = load_session(cli)?;
    let auditor = BatchAuditor::new().with_workers(session.config.workers);

    let normative = auditor.audit_normative(&session.inventory, &session.repo)?;
    let operational = auditor.audit_operational(&session.inventory, &session.repo)?;

    println!("✓ Audited {} rows\n", normative.row_count());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(normative, operational);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_cli: &CliArgs) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: warehouse-auditor audit <inventory> --output results.csv");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cli_parse_options_and_positional() {
        let cli = CliArgs::parse(&args(&[
            "warehouse-auditor", "audit", "stock.csv", "--mode", "operational", "--init",
        ]));

        assert_eq!(cli.command, "audit");
        assert_eq!(cli.inventory().unwrap(), PathBuf::from("stock.csv"));
        assert_eq!(cli.value("--mode"), Some("operational"));
        assert!(cli.has("--init"));
        assert_eq!(cli.value("--init"), None);
    }

    #[test]
    fn test_output_path_per_mode() {
        let base = Path::new("out/results.csv");

        assert_eq!(output_path(base, Mode::Normative, false), PathBuf::from("out/results.csv"));
        assert_eq!(
            output_path(base, Mode::Operational, true),
            PathBuf::from("out/results_operational.csv")
        );
    }
}
