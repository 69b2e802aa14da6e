mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{ActionArg, Cli, ClassifyArgs, Commands, FormatArg};
use dotenv::dotenv;
use progress::ProgressDisplay;
use sortwise_core::config::{self, AppConfig, PRESETS};
use sortwise_core::plan::{self, export};
use sortwise_core::{
    executor, remote, Analysis, CancelToken, ExecutionReport, ExportFormat, OrganizationPlan,
    OrganizeEngine, PlanAction,
};
use tracing::{info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = config::load_configuration().context("Error loading configuration")?;

    let args = Cli::parse();

    match args.command {
        Some(Commands::Analyze {
            source,
            target,
            action,
            export,
            format,
            classify,
        }) => run_analyze(config, &source, target, action, export, format, &classify),
        Some(Commands::Organize {
            source,
            target,
            action,
            yes,
            classify,
        }) => run_organize(config, &source, target, action, yes, &classify),
        Some(Commands::Execute { plan, yes }) => run_execute(&config, &plan, yes),
        Some(Commands::CheckEndpoint { endpoint }) => {
            let endpoint = endpoint.unwrap_or_else(|| config.remote.endpoint.clone());
            run_check_endpoint(&endpoint)
        }
        Some(Commands::PrintConfig) => {
            let rendered =
                toml::to_string_pretty(&config).context("Could not render configuration")?;
            println!("{}", rendered);
            Ok(())
        }
        Some(Commands::Presets) => {
            for preset in PRESETS {
                println!("{} {}", format!("{}.", preset.number).cyan(), preset.name.bold());
                if !preset.prompt.is_empty() {
                    println!("   {}", preset.prompt.dimmed());
                }
            }
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    }
}

fn analyze_with_progress(
    mut config: AppConfig,
    source: &Path,
    classify: &ClassifyArgs,
) -> anyhow::Result<(OrganizeEngine, Analysis)> {
    classify.apply(&mut config);
    let engine = OrganizeEngine::new(config).context("Could not set up the organizer")?;
    info!("Metadata reader: {}", engine.metadata_provider_name());

    let (tx, display) = ProgressDisplay::spawn();
    let result = engine.analyze(source, &tx);
    drop(tx);
    display.finish();

    let analysis = result.with_context(|| format!("Analysis of {} failed", source.display()))?;
    print_analysis(&analysis);
    Ok((engine, analysis))
}

fn run_analyze(
    config: AppConfig,
    source: &Path,
    target: Option<PathBuf>,
    action: ActionArg,
    export_path: Option<PathBuf>,
    format: Option<FormatArg>,
    classify: &ClassifyArgs,
) -> anyhow::Result<()> {
    let (engine, analysis) = analyze_with_progress(config, source, classify)?;
    let plan = engine.build_plan(&analysis, target.as_deref(), action.into());

    println!();
    println!("{}", export::to_summary(&plan));

    if let Some(path) = export_path {
        let format = format
            .map(ExportFormat::from)
            .or_else(|| ExportFormat::from_path(&path))
            .unwrap_or(ExportFormat::Json);
        let path = if path.is_dir() {
            path.join(format.default_file_name())
        } else {
            path
        };
        plan::write_plan(&plan, format, &path)
            .with_context(|| format!("Could not write plan to {}", path.display()))?;
        println!("Plan written to {}", path.display().to_string().green());
    }

    Ok(())
}

fn run_organize(
    config: AppConfig,
    source: &Path,
    target: Option<PathBuf>,
    action: ActionArg,
    yes: bool,
    classify: &ClassifyArgs,
) -> anyhow::Result<()> {
    let action: PlanAction = action.into();
    if action == PlanAction::Export {
        bail!("Use `analyze --export` to write a plan without executing it");
    }

    let (engine, analysis) = analyze_with_progress(config, source, classify)?;
    if analysis.cancelled {
        bail!("Analysis was cancelled; nothing was changed");
    }

    let plan = engine.build_plan(&analysis, target.as_deref(), action);
    println!();
    println!("{}", export::to_summary(&plan));

    if !yes && !confirm_plan(&plan)? {
        println!("Nothing was changed.");
        return Ok(());
    }

    let (tx, display) = ProgressDisplay::spawn();
    let result = engine.execute(&plan, &tx);
    drop(tx);
    display.finish();

    print_report(&result.context("Plan execution failed")?);
    Ok(())
}

fn run_execute(config: &AppConfig, plan_path: &Path, yes: bool) -> anyhow::Result<()> {
    let plan = plan::load_plan(plan_path)
        .with_context(|| format!("Could not load plan {}", plan_path.display()))?;
    plan.validate().context("Plan cannot be executed")?;

    println!(
        "Plan from {}: {} {} files into {}",
        plan.created_at,
        plan.action.as_str().to_uppercase(),
        plan.moves.len(),
        plan.target_root.cyan()
    );

    if !yes && !confirm_plan(&plan)? {
        println!("Nothing was changed.");
        return Ok(());
    }

    let (tx, display) = ProgressDisplay::spawn();
    let result = executor::execute(&plan, &config.execute, &CancelToken::new(), &tx);
    drop(tx);
    display.finish();

    print_report(&result.context("Plan execution failed")?);
    Ok(())
}

fn run_check_endpoint(endpoint: &str) -> anyhow::Result<()> {
    println!("Checking {}...", remote::normalize_endpoint(endpoint));
    match remote::probe(endpoint, PROBE_TIMEOUT) {
        Ok(url) => {
            println!("{} Server reachable at {}", "✓".green(), url);
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            bail!("Endpoint check failed")
        }
    }
}

fn print_analysis(analysis: &Analysis) {
    let remote_classified = analysis.remote.as_ref().map(|r| r.classified).unwrap_or(0);

    info!(
        "{} files, {} duplicates, {} classified remotely",
        format!("{}", analysis.records.len()).green(),
        format!("{}", analysis.duplicates).red(),
        format!("{}", remote_classified).cyan(),
    );
    info!(
        "Scan: {}, Classify: {}, Remote: {}",
        format!("{:.2}s", analysis.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", analysis.classify_duration.as_secs_f64()).green(),
        format!("{:.2}s", analysis.remote_duration.as_secs_f64()).green(),
    );

    if analysis.skipped_files > 0 || analysis.unreadable_dirs > 0 {
        warn!(
            "Skipped {} unreadable files and {} unreadable folders",
            analysis.skipped_files, analysis.unreadable_dirs
        );
    }
    if analysis.hit_max_files {
        warn!("Stopped at the configured file limit; some files were not scanned");
    }
    if let Some(remote) = &analysis.remote {
        if remote.failed_batches > 0 {
            warn!(
                "{} of {} remote batches failed; those files keep their local classification",
                remote.failed_batches, remote.batches
            );
        }
    }
    if analysis.cancelled {
        warn!("Analysis cancelled; results are partial");
    }
}

fn print_report(report: &ExecutionReport) {
    println!();
    println!(
        "{} succeeded, {} failed{}",
        format!("{}", report.succeeded).green(),
        format!("{}", report.failed).red(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
    for message in &report.errors {
        println!("  {}", message.red());
    }
}

fn confirm_plan(plan: &OrganizationPlan) -> io::Result<bool> {
    let verb = match plan.action {
        PlanAction::Move => "Move",
        _ => "Copy",
    };
    prompt_confirm(
        &format!(
            "{} {} files into {}?",
            verb,
            plan.moves.len(),
            plan.target_root
        ),
        Some(false),
    )
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            // EOF: take the default rather than spinning.
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
