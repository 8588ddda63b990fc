use std::time::Duration;

use clap::{Parser, Subcommand};
use validator::{Validate, ValidationErrors};

use crate::configuration::Configuration;

pub const DEFAULT_API_BASE_URL: &str = "https://laravel-test-system.orbit-node.com/api";
pub const DEFAULT_LOG_FILTER: &str = "appointment_console=info";

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Print one page of appointments
    List,
    /// Interactive console with background refresh
    Watch,
    /// Show one appointment with its staff options
    Show { id: String },
    /// Assign a staff member to an appointment
    Assign { id: String, staff_id: String },
    /// Cancel an appointment
    Cancel { id: String },
    /// Print the staff roster
    Staff,
}

#[derive(Parser, Validate, Debug, Clone)]
#[command(name = "appointment-console", version, about = "Admin console for service appointments")]
pub struct ConfigurationHandler {
    /// Base URL of the admin API
    #[arg(long, env = "ADMIN_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    #[validate(url)]
    api_base_url: String,

    /// Bearer token sent with every request
    #[arg(long, env = "ADMIN_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Startup filters as a query string, e.g. "status=pending&page=2&q=jane"
    #[arg(long, env = "ADMIN_CONSOLE_QUERY", default_value = "")]
    query: String,

    /// Seconds between background refreshes
    #[arg(long, default_value_t = 30)]
    #[validate(range(min = 1, max = 3600))]
    poll_seconds: u64,

    /// Milliseconds of quiet input before a search applies
    #[arg(long, default_value_t = 200)]
    #[validate(range(max = 10_000))]
    debounce_ms: u64,

    /// tracing filter directive, overridden by RUST_LOG
    #[arg(long, default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,

    #[command(subcommand)]
    command: Option<ConsoleCommand>,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Result<Self, ValidationErrors> {
        let configuration = Self::parse();
        configuration.validate()?;
        Ok(configuration)
    }
}

impl Configuration for ConfigurationHandler {
    fn api_base_url(&self) -> String {
        self.api_base_url.clone()
    }

    fn auth_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|token| !token.trim().is_empty())
    }

    fn initial_query(&self) -> String {
        self.query.clone()
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_seconds)
    }

    fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn log_filter(&self) -> String {
        self.log_filter.clone()
    }

    fn command(&self) -> ConsoleCommand {
        self.command.clone().unwrap_or(ConsoleCommand::List)
    }
}
