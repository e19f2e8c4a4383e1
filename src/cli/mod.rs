pub mod onboard;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "breadcrumb",
    about = "Breadcrumb Tracker: habit and activity tracking with daily targets"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// First-run setup: pick a port, create the database, log in.
    Onboard,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Log in with a username, creating the user on first use.
    Login {
        username: Option<String>,
    },
    Logout,
    Whoami,
    Status,
    Doctor,
    /// Run the API server in the foreground.
    Serve,
    /// Print analytics for a monthly, yearly or all-time window.
    Stats {
        #[arg(long, default_value = "monthly")]
        view: String,
        /// Month as YYYY-MM (monthly view only, defaults to the current month).
        #[arg(long)]
        month: Option<String>,
        /// Year (yearly view only, defaults to the current year).
        #[arg(long)]
        year: Option<i32>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
