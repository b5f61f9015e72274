mod commands;
mod display;
mod logging;
mod progress;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use menu_tidy_core::{AppConfig, Engine};
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> anyhow::Result<ExitCode> {
    let mut config = menu_tidy_core::config::load_configuration()
        .context("Error loading configuration")?;
    if let Some(root) = args.root {
        config.root_path = Some(root);
    }
    if let Some(layout) = args.layout {
        config.layout_path = layout;
    }

    match args.command {
        Some(Commands::Display { details }) => run_display(config, details),
        Some(Commands::Save { no_archive }) => run_save(config, !no_archive),
        Some(Commands::Enforce {
            unattended,
            dry_run,
        }) => run_enforce(config, unattended, dry_run),
        Some(Commands::Diff) => run_diff(config),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_display(config: AppConfig, details: bool) -> anyhow::Result<ExitCode> {
    let engine = Engine::new(config);
    let layout = engine.load_layout().context("Cannot display layout")?;
    info!("Layout from {}", engine.config().layout_path.display());
    display::print_layout(&layout, details);
    Ok(ExitCode::SUCCESS)
}

fn run_save(config: AppConfig, with_archive: bool) -> anyhow::Result<ExitCode> {
    let engine = Engine::new(config);
    let reporter = CliReporter::new();
    let result = engine.save(with_archive, &reporter).context("Save failed")?;

    println!();
    info!(
        "Saved {} folders and {} items to {} in {}",
        format!("{}", result.model.folder_count()).cyan(),
        format!("{}", result.model.item_count()).cyan(),
        result.layout_path.display(),
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
    );
    if result.metadata_failures > 0 {
        warn!(
            "{} items were saved without metadata and cannot be recreated",
            format!("{}", result.metadata_failures).yellow()
        );
    }
    if let Some(diff) = &result.diff {
        println!("Changes since the previous save:");
        display::print_diff(diff);
    }
    if let Some(archive) = &result.archive_path {
        info!("Archive written to {}", archive.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn run_enforce(config: AppConfig, unattended: bool, dry_run: bool) -> anyhow::Result<ExitCode> {
    let engine = Engine::new(config);
    let reporter = CliReporter::new();

    // Nothing is touched until the plan has been built and accepted.
    let planned = engine.plan(&reporter).context("Enforce aborted")?;
    println!();
    display::print_plan(&planned.plan);

    if planned.plan.is_empty() || dry_run {
        return Ok(ExitCode::SUCCESS);
    }

    if !unattended {
        let prompt = format!("Apply {} actions to {}?", planned.plan.len(), planned.root.display());
        if !prompt_confirm(&prompt, Some(false))? {
            info!("Nothing changed.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let report = engine.execute(&planned, &reporter);

    println!();
    info!(
        "{} succeeded, {} failed",
        format!("{}", report.success_count).green(),
        format!("{}", report.error_count).red(),
    );
    for result in &report.results {
        if let Err(reason) = &result.outcome {
            println!("  {} {}: {}", "✗".red(), result.action, reason);
        }
    }

    if report.error_count > 0 {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn run_diff(config: AppConfig) -> anyhow::Result<ExitCode> {
    let engine = Engine::new(config);
    let reporter = CliReporter::new();
    let diff = engine.diff_live(&reporter).context("Diff failed")?;
    println!();
    display::print_diff(&diff);
    Ok(ExitCode::SUCCESS)
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
            // Closed stdin counts as a refusal.
            return Ok(false);
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
