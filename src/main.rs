mod analytics;
mod api;
mod checklist;
mod cli;
mod config;
mod db;
mod model;
mod service;
mod session;
mod state;
mod views;

use crate::cli::onboard::run_onboarding;
use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::Config;
use crate::service::Tracker;
use crate::state::StateStore;
use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            let _ = run_onboarding()?;
            Ok(())
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Login { username } => handle_login(username),
        Commands::Logout => handle_logout(),
        Commands::Whoami => handle_whoami(),
        Commands::Status => handle_status(),
        Commands::Doctor => handle_doctor(),
        Commands::Serve => {
            let config = load_config()?;
            run_service(config).await
        }
        Commands::Stats { view, month, year } => handle_stats(&view, month.as_deref(), year),
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_login(username: Option<String>) -> Result<()> {
    let config = load_config()?;
    let tracker = Tracker::open(&config.db_path)?;
    let mut state = StateStore::load(&config.state_path);

    let username = match username {
        Some(value) => value,
        None => dialoguer::Input::<String>::new()
            .with_prompt("Username")
            .interact_text()
            .context("Failed to read username")?,
    };

    let user = session::login(&tracker, &mut state, &username)?;
    println!("Logged in as {} (user id {})", user.username, user.id);

    Ok(())
}

fn handle_logout() -> Result<()> {
    let config = load_config()?;
    let mut state = StateStore::load(&config.state_path);
    session::logout(&mut state)?;
    println!("Logged out");

    Ok(())
}

fn handle_whoami() -> Result<()> {
    let config = load_config()?;
    let tracker = Tracker::open(&config.db_path)?;
    let mut state = StateStore::load(&config.state_path);

    match session::restore(&tracker, &mut state)? {
        Some(user) => println!("{} (user id {})", user.username, user.id),
        None => println!("Not logged in"),
    }

    Ok(())
}

fn handle_status() -> Result<()> {
    let config = load_config()?;
    let tracker = Tracker::open(&config.db_path)?;
    let mut state = StateStore::load(&config.state_path);
    let user = session::restore(&tracker, &mut state)?;

    println!("Breadcrumb Tracker status");
    println!("- db_path: {}", config.db_path.display());
    println!("- api_port: {}", config.api_port);
    match user {
        Some(user) => {
            let activities = tracker.get_activities(user.id)?;
            println!("- logged_in_as: {}", user.username);
            println!("- activities: {}", activities.len());
        }
        None => println!("- logged_in_as: none"),
    }

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = load_or_default_config()?;

    match Tracker::open(&config.db_path) {
        Ok(_) => println!("[OK] SQLite reachable: {}", config.db_path.display()),
        Err(error) => {
            println!("[WARN] SQLite check failed: {error}");
            issues.push("db unreachable".to_string());
        }
    }

    if config.state_path.exists() {
        println!("[OK] state file exists: {}", config.state_path.display());
    } else {
        println!("[OK] state file not created yet (defaults apply)");
    }

    if let Err(error) = config.parse_analytics_epoch() {
        println!("[WARN] invalid analytics_epoch setting: {error}");
        issues.push("invalid analytics_epoch".to_string());
    } else {
        println!("[OK] analytics_epoch format valid: {}", config.analytics_epoch);
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

fn handle_stats(view: &str, month: Option<&str>, year: Option<i32>) -> Result<()> {
    let config = load_config()?;
    let tracker = Tracker::open(&config.db_path)?;
    let mut state = StateStore::load(&config.state_path);
    let user = session::require_user(&tracker, &mut state)?;

    let today = Local::now().date_naive();
    let (start, end) = match view {
        "monthly" => {
            let (y, m) = match month {
                Some(raw) => parse_year_month(raw)?,
                None => (today.year(), today.month()),
            };
            analytics::month_window(y, m)?
        }
        "yearly" => analytics::year_window(year.unwrap_or_else(|| today.year()))?,
        "alltime" => (config.parse_analytics_epoch()?, today),
        other => bail!("Unsupported stats view: {other}. Use monthly, yearly or alltime"),
    };

    let report = views::analytics_view(&tracker, user.id, start, end)?;

    println!("Analytics {} .. {}", report.start, report.end);
    println!("- active_days: {}", report.active_days);
    println!("- activities: {}", report.activity_count);
    println!("- completion: {}%", report.completion_percentage);

    for activity in &report.activities {
        println!("\n{} ({} completions)", activity.name, activity.completions);
        for marker in &activity.markers {
            match marker.target {
                Some(target) => println!(
                    "  - {}: {}x, {} days hit target ({target}/day)",
                    marker.label, marker.completions, marker.days_target_met
                ),
                None => println!("  - {}: {}x", marker.label, marker.completions),
            }
        }
        if activity.days_with_target > 0 {
            println!(
                "  target success: {}% ({}/{} days)",
                activity.overall_percentage, activity.days_target_met, activity.days_with_target
            );
        }
    }

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let _ = Tracker::open(&config.db_path)?;

    let shared_config = Arc::new(config);
    info!("Breadcrumb Tracker service started");

    tokio::select! {
        api_result = api::run_server(Arc::clone(&shared_config)) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn parse_year_month(raw: &str) -> Result<(i32, u32)> {
    let (year, month) = raw
        .split_once('-')
        .with_context(|| format!("Invalid month format: {raw}. Example: 2026-02"))?;
    let year = year
        .parse::<i32>()
        .with_context(|| format!("Invalid year in month: {raw}"))?;
    let month = month
        .parse::<u32>()
        .with_context(|| format!("Invalid month number in: {raw}"))?;
    if !(1..=12).contains(&month) {
        bail!("Month out of range: {raw}");
    }

    Ok((year, month))
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}

fn load_config() -> Result<Config> {
    Config::load().with_context(|| "Config file not found. Run `breadcrumb onboard` first.".to_string())
}
