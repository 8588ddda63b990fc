use std::time::Duration;

use crate::configuration_handler::ConsoleCommand;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn api_base_url(&self) -> String;
    fn auth_token(&self) -> Option<String>;
    /// Page query string the console starts from, e.g. `status=pending&page=2`.
    fn initial_query(&self) -> String;
    fn poll_interval(&self) -> Duration;
    fn search_debounce(&self) -> Duration;
    fn log_filter(&self) -> String;
    fn command(&self) -> ConsoleCommand;
}
