//! Terminal rendering for command results.

use std::process::ExitCode;

use anyhow::Result;
use console::style;

use teresa_core::api::{App, Team};
use teresa_core::config::TeresaConfig;
use teresa_core::deploy::DeployReport;
use teresa_core::error::DeployError;

/// Exit code for a user interrupt (128 + SIGINT).
pub const EXIT_INTERRUPTED: u8 = 130;

/// Process exit code for a deploy error.
///
/// Confirmed failures and preflight errors exit with 1; outcomes whose
/// remote state is unknown get their own codes so scripts can tell them
/// apart.
pub fn deploy_exit_code(err: &DeployError) -> u8 {
    match err {
        DeployError::DeploymentTimedOut { .. } => 2,
        DeployError::StreamEndedWithoutTerminalMarker { .. } => 3,
        DeployError::StreamInterrupted { .. } => 4,
        _ => 1,
    }
}

pub fn print_deploy_success(report: &DeployReport) {
    println!(
        "{} {} deployed in {:.1}s",
        style("✓").green().bold(),
        style(&report.application.name).green(),
        report.elapsed.as_secs_f64()
    );
}

pub fn print_deploy_error(err: &DeployError) -> ExitCode {
    if err.is_ambiguous() {
        eprintln!("{} {}", style("Deploy status unknown:").yellow().bold(), err);
        eprintln!(
            "  Check the application with `teresa app info` before deploying again."
        );
    } else {
        eprintln!("{} {}", style("✗").red().bold(), err);
    }
    ExitCode::from(deploy_exit_code(err))
}

pub fn print_interrupted() -> ExitCode {
    eprintln!(
        "{} the remote deployment may still be running",
        style("Interrupted:").yellow().bold()
    );
    ExitCode::from(EXIT_INTERRUPTED)
}

pub fn print_apps(apps: &[App]) {
    if apps.is_empty() {
        println!("No apps found.");
        return;
    }

    println!("  {:<24} {:<16} Addresses", "Name", "Team");
    println!("  {}", "-".repeat(60));
    for app in apps {
        println!(
            "  {:<24} {:<16} {}",
            app.name,
            app.team.as_deref().unwrap_or("-"),
            app.address_list.join(", ")
        );
    }
}

pub fn print_app_info(app: &App) {
    println!("{}", style(&app.name).bold());
    println!("  Team:      {}", app.team.as_deref().unwrap_or("-"));
    match app.scale {
        Some(scale) => println!("  Scale:     {scale}"),
        None => println!("  Scale:     -"),
    }
    if app.address_list.is_empty() {
        println!("  Addresses: -");
    } else {
        println!("  Addresses:");
        for address in &app.address_list {
            println!("    {address}");
        }
    }
    if !app.env_vars.is_empty() {
        println!("  Env vars:");
        for var in &app.env_vars {
            println!("    {}={}", var.key, var.value);
        }
    }
}

pub fn print_app_created(app: &App) {
    println!(
        "{} app {} created (team: {}, scale: {})",
        style("✓").green().bold(),
        style(&app.name).green(),
        app.team.as_deref().unwrap_or("-"),
        app.scale.map_or_else(|| "-".to_string(), |s| s.to_string())
    );
}

pub fn print_env_vars(app: &App) {
    println!("{} env vars of {} updated", style("✓").green().bold(), style(&app.name).green());
    for var in &app.env_vars {
        println!("  {}={}", var.key, var.value);
    }
}

pub fn print_teams(teams: &[Team]) {
    if teams.is_empty() {
        println!("No teams found.");
        return;
    }

    println!("  {:<20} {:<28} URL", "Name", "Email");
    println!("  {}", "-".repeat(60));
    for team in teams {
        println!(
            "  {:<20} {:<28} {}",
            team.name,
            team.email.as_deref().unwrap_or("-"),
            team.url.as_deref().unwrap_or("-")
        );
    }
}

/// Cluster list with the current one marked; tokens are never printed.
pub fn print_config(config: &TeresaConfig) {
    if config.clusters.is_empty() {
        println!("No clusters configured.");
        println!("Add one with 'teresa config set-cluster <name> --server <url>'.");
        return;
    }

    let current = config.current_cluster.as_deref();
    for (name, cluster) in &config.clusters {
        let marker = if Some(name.as_str()) == current {
            style("*").green().bold().to_string()
        } else {
            " ".to_string()
        };
        let login = if cluster.token.is_some() {
            style("logged in").green()
        } else {
            style("not logged in").dim()
        };
        println!("{marker} {:<16} {:<40} {}", name, cluster.server, login);
    }
    println!();
    println!("Deploy timeout: {}s", config.deploy.timeout_secs);
    if let Some(dir) = &config.deploy.temp_dir {
        println!("Temp dir:       {}", dir.display());
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
