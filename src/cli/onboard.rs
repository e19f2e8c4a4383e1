use crate::config::Config;
use crate::service::Tracker;
use crate::session;
use crate::state::StateStore;
use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Input};

pub fn run_onboarding() -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to Breadcrumb Tracker onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();
    let defaults = Config::default();

    println!("\n[1/3] API port");
    let api_port: u16 = Input::with_theme(&theme)
        .with_prompt("  Port for the local API server")
        .default(defaults.api_port)
        .interact_text()
        .context("Failed to read API port")?;

    println!("\n[2/3] Analytics epoch");
    let analytics_epoch: String = Input::with_theme(&theme)
        .with_prompt("  Start date for the all-time analytics view (YYYY-MM-DD)")
        .default(defaults.analytics_epoch.clone())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            crate::model::parse_date(input)
                .map(|_| ())
                .map_err(|_| "Use YYYY-MM-DD format (example: 2020-01-01)")
        })
        .interact_text()
        .context("Failed to read analytics epoch")?;

    let config = Config {
        api_port,
        analytics_epoch,
        ..Config::default()
    };

    config.ensure_bootstrap_files()?;
    config.save()?;
    let tracker = Tracker::open(&config.db_path)?;

    println!("\n[3/3] Log in");
    let username: String = Input::with_theme(&theme)
        .with_prompt("  Username")
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            if input.trim().is_empty() {
                Err("Username must not be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read username")?;

    let mut state = StateStore::load(&config.state_path);
    let user = session::login(&tracker, &mut state, &username)?;
    println!("  ✓ Logged in as {} (user id {})", user.username, user.id);

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Run `breadcrumb serve` to start the API server.");
    println!("  Run `breadcrumb status` to check current state.");
    println!("──────────────────────────────────────────");

    Ok(config)
}
