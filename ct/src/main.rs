use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use covtrack::cli::{Cli, Command};
use covtrack::config::{Config, LOCAL_CONFIG};
use covtrack::{
    BestRecordStore, CommandSummary, FileSummary, ProgressionController, ProgressionError, RunContext, RunReport,
    SummarySource, discover_modules,
};

fn setup_logging(log_level: Option<&str>) -> Result<()> {
    let level = match log_level {
        Some(level) => level
            .parse::<tracing::Level>()
            .map_err(|_| eyre::eyre!("Invalid log level: {}", level))?,
        None => tracing::Level::WARN,
    };

    // stdout carries the verdict; logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let config = Config::load(cli.config.as_ref(), &root).context("Failed to load configuration")?;
    let ctx = RunContext::new(&root)
        .with_results_dir(config.results_dir.clone())
        .with_data_file(config.data_file.clone());

    info!(root = %root.display(), "covtrack starting");

    match cli.command {
        Command::Check {
            summary,
            command,
            version_stamp,
            no_fail,
        } => {
            let ctx = match version_stamp {
                Some(stamp) => ctx.with_version_stamp(stamp),
                None => ctx,
            };
            let fail_on_regression = config.fail_on_regression && !no_fail;

            if let Some(path) = summary {
                return cmd_check(ctx, FileSummary::new(path), fail_on_regression);
            }
            let argv = command.or_else(|| config.summary_command.clone()).unwrap_or_default();
            match CommandSummary::from_argv(&argv) {
                Some(source) => cmd_check(ctx, source.in_dir(&root), fail_on_regression),
                None => Err(eyre::eyre!(
                    "No summary source: pass --summary, --command, or set summary_command in {}",
                    LOCAL_CONFIG
                )),
            }
        }
        Command::Compare { summary } => cmd_compare(ctx, FileSummary::new(summary)),
        Command::Show => cmd_show(&ctx),
        Command::Reset => cmd_reset(&ctx),
        Command::Modules { packages } => {
            let packages = if packages.is_empty() { config.packages.clone() } else { packages };
            for module in discover_modules(&root, &packages, &config.module_extension) {
                println!("{}", module);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Init { force } => cmd_init(&root, &config, force),
    }
}

/// Run one full progression cycle
fn cmd_check<S: SummarySource>(ctx: RunContext, source: S, fail_on_regression: bool) -> Result<ExitCode> {
    let data_file = ctx.layout().data_file;
    let mut controller = ProgressionController::new(ctx, source)?;
    controller.begin_run()?;

    let report = controller.finalize_run().map_err(report_fatal)?;
    if data_file.exists() {
        println!("Coverage results written to {}", data_file.display());
    }
    emit(&report);

    if report.passed(fail_on_regression) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_compare<S: SummarySource>(ctx: RunContext, source: S) -> Result<ExitCode> {
    let mut controller = ProgressionController::new(ctx, source)?;
    let report = controller.compare().map_err(report_fatal)?;
    emit(&report);
    Ok(ExitCode::SUCCESS)
}

fn cmd_show(ctx: &RunContext) -> Result<ExitCode> {
    let store = BestRecordStore::inspect(ctx.layout());
    let path = store.layout().best_summary.clone();

    match store.load_best().context(format!("Failed to load {}", path.display()))? {
        None => println!("No best-ever coverage record in {}", store.layout().best_dir.display()),
        Some(best) => {
            let total = best.report.total();
            println!("Best-ever coverage: {}", path.display().to_string().cyan());
            println!("  Untested lines: {}", total.uncovered());
            println!("  Uncovered: {}", total.missed);
            println!("  Partially covered: {}", total.partial);
            println!("  Files: {}", best.report.files().len());
            if let Some(stamp) = best.version_stamp {
                println!("  Version: {}", stamp.trim());
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_reset(ctx: &RunContext) -> Result<ExitCode> {
    let store = BestRecordStore::inspect(ctx.layout());
    if store.reset()? {
        println!("{} Removed best-ever record", "✓".green());
    } else {
        println!("No best-ever record to remove");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_init(root: &Path, config: &Config, force: bool) -> Result<ExitCode> {
    let path: PathBuf = root.join(LOCAL_CONFIG);
    if path.exists() && !force {
        return Err(eyre::eyre!("{} already exists (use --force to overwrite)", path.display()));
    }
    config.save(&path).context(format!("Failed to write {}", path.display()))?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(ExitCode::SUCCESS)
}

fn emit(report: &RunReport) {
    for line in &report.warnings {
        eprintln!("{}", line);
    }
    print!("{}", report.message);
}

/// Print the one-line diagnostic for summary parse failures before propagating
fn report_fatal(err: ProgressionError) -> eyre::Report {
    if let ProgressionError::Parse(parse) = &err {
        eprintln!("{}", parse.diagnostic());
    }
    eyre::Report::new(err)
}
