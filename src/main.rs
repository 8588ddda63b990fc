use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    backend::AdminApi,
    commands::CommandExecutor,
    configuration::Configuration,
    configuration_handler::{ConfigurationHandler, ConsoleCommand},
    http_client::HttpAdminApi,
    render::{Notice, Renderer, TerminalRenderer},
    store::StateStore,
    sync::{FilterState, SyncController, SyncSettings},
    types::RecordId,
};

mod availability;
mod backend;
mod commands;
mod configuration;
mod configuration_handler;
mod error;
mod http_client;
mod render;
mod rules;
mod store;
mod sync;
#[cfg(test)]
mod testutils;
mod timestamps;
mod types;
mod view;

const WATCH_HELP: &str = "\
Commands:
  /<text>      search the current page (empty text clears)
  n / p        next / previous page
  s <status>   filter by status (all, pending, in_progress, completed, cancelled)
  v <id>       open an appointment
  x            close the open appointment
  a <staff>    assign a staff member to the open appointment
  c            cancel the open appointment
  r            refresh now
  h            show this help
  q            quit";

struct Console {
    api: HttpAdminApi,
    renderer: Arc<TerminalRenderer>,
    sync: SyncController<HttpAdminApi, TerminalRenderer>,
    commands: CommandExecutor<HttpAdminApi, TerminalRenderer>,
}

impl Console {
    fn new(api: HttpAdminApi, configuration: &ConfigurationHandler) -> Self {
        let store = StateStore::default();
        let renderer = Arc::new(TerminalRenderer);
        let filters = FilterState::hydrate_or_fallback(&configuration.initial_query());
        let settings = SyncSettings {
            poll_interval: configuration.poll_interval(),
            search_debounce: configuration.search_debounce(),
        };

        Self {
            sync: SyncController::new(
                api.clone(),
                store.clone(),
                renderer.clone(),
                filters,
                settings,
            ),
            commands: CommandExecutor::new(api.clone(), store, renderer.clone()),
            api,
            renderer,
        }
    }

    /// Failures have already been shown to the user when this returns false.
    async fn run(&self, command: ConsoleCommand) -> bool {
        match command {
            ConsoleCommand::List => self.sync.start().await.is_ok(),
            ConsoleCommand::Watch => self.watch().await,
            ConsoleCommand::Show { id } => self.open(&id).await,
            ConsoleCommand::Assign { id, staff_id } => {
                self.open(&id).await && self.commands.assign_staff(&staff_id).await.is_ok()
            }
            ConsoleCommand::Cancel { id } => {
                self.open(&id).await && self.commands.cancel_appointment().await.is_ok()
            }
            ConsoleCommand::Staff => self.print_staff().await,
        }
    }

    async fn open(&self, id: &str) -> bool {
        let roster = self.sync.start().await.is_ok();
        roster && self.sync.open_appointment(&RecordId::new(id)).await.is_ok()
    }

    async fn print_staff(&self) -> bool {
        match self.api.staff().await {
            Ok(staff) => {
                for member in &staff {
                    println!("{:>5}  {}", member.id, member.display_label());
                }
                true
            }
            Err(err) => {
                warn!(%err, "could not load staff roster");
                if !err.is_unauthorized() {
                    self.renderer.notify(&Notice::error("Failed to load staff."));
                }
                false
            }
        }
    }

    async fn watch(&self) -> bool {
        self.sync.start().await.ok();
        self.sync.start_polling();
        println!("{WATCH_HELP}");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    error!(%err, "could not read from stdin");
                    break;
                }
            };
            if !self.handle_line(line.trim()).await {
                break;
            }
        }

        self.sync.stop();
        true
    }

    /// Returns false when the user asked to quit.
    async fn handle_line(&self, line: &str) -> bool {
        if let Some(search) = line.strip_prefix('/') {
            self.sync.set_search(search.trim());
            return true;
        }

        let (verb, argument) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(verb, argument)| (verb, argument.trim()));

        match (verb, argument) {
            ("", _) => {}
            ("q" | "quit", _) => return false,
            ("h" | "help", _) => println!("{WATCH_HELP}"),
            ("r", _) => {
                self.sync.refresh().await.ok();
            }
            ("n", _) => {
                if let Ok(false) = self.sync.next_page().await {
                    println!("Already on the last page.");
                }
            }
            ("p", _) => {
                if let Ok(false) = self.sync.previous_page().await {
                    println!("Already on the first page.");
                }
            }
            ("s", status) => {
                self.sync.set_status_filter(status).await.ok();
            }
            ("v", id) if !id.is_empty() => {
                self.sync.open_appointment(&RecordId::new(id)).await.ok();
            }
            ("x", _) => self.sync.close_appointment(),
            ("a", staff_id) => {
                self.commands.assign_staff(staff_id).await.ok();
            }
            ("c", _) => {
                self.commands.cancel_appointment().await.ok();
            }
            _ => println!("Unknown command `{line}`, type h for help."),
        }
        true
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let configuration = match ConfigurationHandler::parse_arguments() {
        Ok(configuration) => configuration,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(configuration.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let api = match HttpAdminApi::new(&configuration.api_base_url(), configuration.auth_token()) {
        Ok(api) => api,
        Err(err) => {
            error!(%err, "Invalid admin API base URL");
            return ExitCode::FAILURE;
        }
    }
    .on_unauthorized(|| eprintln!("Session expired or not authorized. Please log in again."));

    info!(
        base_url = %configuration.api_base_url(),
        authenticated = configuration.auth_token().is_some(),
        "admin console starting"
    );

    let console = Console::new(api, &configuration);
    if console.run(configuration.command()).await {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
