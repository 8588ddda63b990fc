//! Keeps the [`StateStore`] in step with the admin API.
//!
//! Fetches are never cancelled: when two overlap, whichever response lands
//! last wins, even if it belongs to an older filter. The loading flag is the
//! only coordination between polling and user-triggered fetches.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::try_join;
use reqwest::Url;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::availability::AvailabilityChecker;
use crate::backend::{AdminApi, ListQuery};
use crate::error::ApiError;
use crate::render::{publish, Notice, Renderer};
use crate::rules::is_assignment_locked;
use crate::store::{Action, StateStore};
use crate::types::{Appointment, AppointmentPage, RecordId};
use crate::view::PaginationControls;

pub const STATUS_FILTER_ALL: &str = "all";
/// Status filter used when the startup query string cannot be read.
pub const HYDRATION_FALLBACK_STATUS: &str = "most_recent";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(200);

const LOAD_FAILED: &str = "Failed to load admin appointments.";
const REFRESH_FAILED: &str = "Failed to load appointments.";
const DETAILS_FAILED: &str = "Failed to load appointment details.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HydrationError {
    #[error("malformed query string: {0}")]
    Malformed(String),
    #[error("invalid page `{0}`")]
    InvalidPage(String),
}

/// Status filter, page counter and pending search text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub status: String,
    pub page: u32,
    pub search: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            status: STATUS_FILTER_ALL.to_string(),
            page: 1,
            search: String::new(),
        }
    }
}

impl FilterState {
    /// `all` and page 1 are implicit and never sent.
    pub fn list_query(&self) -> ListQuery {
        let status = self.status.trim();
        ListQuery {
            status: (!status.is_empty() && status != STATUS_FILTER_ALL).then(|| status.to_string()),
            page: (self.page > 1).then_some(self.page),
        }
    }

    /// Reads `status`, `page` and `q` from a page query string such as
    /// `?status=pending&page=2&q=jane`.
    pub fn hydrate(query_string: &str) -> Result<Self, HydrationError> {
        let query = query_string.trim().trim_start_matches('?');
        let url = Url::parse(&format!("http://console.invalid/?{query}"))
            .map_err(|err| HydrationError::Malformed(err.to_string()))?;

        let mut filters = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "status" if !value.is_empty() => filters.status = value.into_owned(),
                "page" if !value.is_empty() => {
                    filters.page = value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|page| *page >= 1)
                        .ok_or_else(|| HydrationError::InvalidPage(value.to_string()))?;
                }
                "q" => filters.search = value.into_owned(),
                _ => {}
            }
        }
        Ok(filters)
    }

    /// Like [`FilterState::hydrate`], but a failure yields the
    /// `most_recent` filter instead of `all`.
    pub fn hydrate_or_fallback(query_string: &str) -> Self {
        match Self::hydrate(query_string) {
            Ok(filters) => filters,
            Err(err) => {
                warn!(%err, "could not read startup filters, using {HYDRATION_FALLBACK_STATUS}");
                Self {
                    status: HYDRATION_FALLBACK_STATUS.to_string(),
                    ..Self::default()
                }
            }
        }
    }
}

/// Case-insensitive substring match over customer, vehicle, services, id and
/// raw status. An empty query matches everything.
pub fn matches_search(appointment: &Appointment, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    needle.is_empty() || search_haystack(appointment).contains(&needle)
}

fn search_haystack(appointment: &Appointment) -> String {
    let customer = appointment.customer.as_ref();
    let vehicle = appointment.vehicle.as_ref();
    let services = appointment
        .services
        .iter()
        .filter_map(|service| service.name.as_deref())
        .collect::<Vec<_>>()
        .join(" ");

    [
        customer.and_then(|customer| customer.name.as_deref()),
        customer.and_then(|customer| customer.email.as_deref()),
        vehicle.and_then(|vehicle| vehicle.full_name.as_deref()),
        vehicle.and_then(|vehicle| vehicle.license_plate.as_deref()),
        Some(services.as_str()),
        Some(appointment.id.as_str()),
        appointment.status.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    pub search_debounce: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SyncController<A: AdminApi, R: Renderer> {
    api: A,
    store: StateStore,
    renderer: Arc<R>,
    availability: AvailabilityChecker<A>,
    filters: Arc<Mutex<FilterState>>,
    search_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    poll_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    settings: SyncSettings,
}

impl<A: AdminApi, R: Renderer> Clone for SyncController<A, R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            store: self.store.clone(),
            renderer: self.renderer.clone(),
            availability: self.availability.clone(),
            filters: self.filters.clone(),
            search_task: self.search_task.clone(),
            poll_task: self.poll_task.clone(),
            settings: self.settings,
        }
    }
}

impl<A: AdminApi, R: Renderer> SyncController<A, R> {
    /// The hydrated search text is applied right away, without debounce.
    pub fn new(
        api: A,
        store: StateStore,
        renderer: Arc<R>,
        filters: FilterState,
        settings: SyncSettings,
    ) -> Self {
        store.set_search(filters.search.clone());
        Self {
            availability: AvailabilityChecker::new(api.clone()),
            api,
            store,
            renderer,
            filters: Arc::new(Mutex::new(filters)),
            search_task: Arc::default(),
            poll_task: Arc::default(),
            settings,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn filters(&self) -> FilterState {
        lock(&self.filters).clone()
    }

    pub fn list_query(&self) -> ListQuery {
        lock(&self.filters).list_query()
    }

    pub fn render(&self) {
        publish(&self.store, self.renderer.as_ref());
    }

    /// Loads the staff roster and the first page together.
    pub async fn start(&self) -> Result<(), ApiError> {
        let query = self.list_query();
        info!(?query, "loading staff roster and appointments");

        let loaded = {
            let _loading = self.store.loading_guard();
            try_join!(self.api.staff(), self.api.list_appointments(&query))
        };

        match loaded {
            Ok((staff, page)) => {
                info!(
                    staff = staff.len(),
                    appointments = page.appointments.len(),
                    "console loaded"
                );
                self.store.set_staff(staff);
                self.apply_page(page);
                self.render();
                Ok(())
            }
            Err(err) => {
                self.report(&err, LOAD_FAILED);
                self.render();
                Err(err)
            }
        }
    }

    async fn fetch_page(&self) -> Result<(), ApiError> {
        let query = self.list_query();
        debug!(?query, "fetching appointments");

        let page = {
            let _loading = self.store.loading_guard();
            self.api.list_appointments(&query).await
        }?;

        self.apply_page(page);
        self.render();
        Ok(())
    }

    fn apply_page(&self, page: AppointmentPage) {
        let served = page.pagination.current_page;
        self.store
            .replace_appointments(page.appointments, page.pagination);
        lock(&self.filters).page = served;
    }

    fn report(&self, err: &ApiError, message: &str) {
        if err.is_unauthorized() {
            debug!("request rejected as unauthorized, leaving it to the auth hook");
            return;
        }
        warn!(%err, "{message}");
        self.renderer.notify(&Notice::error(message));
    }

    /// Re-fetches the current filter and page.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let result = self.fetch_page().await;
        if let Err(err) = &result {
            self.report(err, REFRESH_FAILED);
        }
        result
    }

    /// Switches the status filter and goes back to the first page.
    pub async fn set_status_filter(&self, status: &str) -> Result<(), ApiError> {
        {
            let mut filters = lock(&self.filters);
            let status = status.trim();
            filters.status = if status.is_empty() {
                STATUS_FILTER_ALL.to_string()
            } else {
                status.to_string()
            };
            filters.page = 1;
        }
        self.refresh().await
    }

    pub fn pagination_controls(&self) -> PaginationControls {
        PaginationControls::from_pagination(self.store.pagination().as_ref())
    }

    /// Returns `Ok(false)` without fetching when there is no next page.
    pub async fn next_page(&self) -> Result<bool, ApiError> {
        let controls = self.pagination_controls();
        if controls.next_disabled {
            return Ok(false);
        }
        self.step_to(controls.current_page.saturating_add(1)).await
    }

    /// Returns `Ok(false)` without fetching when already on the first page.
    pub async fn previous_page(&self) -> Result<bool, ApiError> {
        let controls = self.pagination_controls();
        if controls.previous_disabled {
            return Ok(false);
        }
        self.step_to(controls.current_page.saturating_sub(1).max(1)).await
    }

    /// Moves from the page the server last served. A failed fetch puts the
    /// counter back.
    async fn step_to(&self, page: u32) -> Result<bool, ApiError> {
        let previous = std::mem::replace(&mut lock(&self.filters).page, page);
        match self.refresh().await {
            Ok(()) => Ok(true),
            Err(err) => {
                lock(&self.filters).page = previous;
                Err(err)
            }
        }
    }

    /// Records a keystroke. The list is re-filtered once input has been
    /// quiet for the debounce interval, using whatever text is current then.
    pub fn set_search(&self, text: &str) {
        lock(&self.filters).search = text.to_string();

        let controller = self.clone();
        let debounce = self.settings.search_debounce;
        let mut pending = lock(&self.search_task);
        if let Some(task) = pending.take() {
            task.abort();
        }
        *pending = Some(tokio::spawn(async move {
            sleep(debounce).await;
            let search = controller.filters().search;
            debug!(%search, "applying search");
            controller.store.set_search(search);
            controller.render();
        }));
    }

    /// Starts the background refresh loop. Calling it again while the loop
    /// runs does nothing.
    pub fn start_polling(&self) {
        let mut poll = lock(&self.poll_task);
        if poll.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let controller = self.clone();
        let period = self.settings.poll_interval;
        info!(?period, "background refresh enabled");
        *poll = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                controller.poll_once().await;
            }
        }));
    }

    /// One poll tick. Skipped while loading or while a detail view is open;
    /// returns whether a fetch was issued.
    pub async fn poll_once(&self) -> bool {
        if !self.store.is_idle() {
            debug!("skipping background refresh");
            return false;
        }
        if let Err(err) = self.fetch_page().await {
            warn!(%err, "background refresh failed");
        }
        true
    }

    pub fn stop(&self) {
        for task in [&self.poll_task, &self.search_task] {
            if let Some(task) = lock(task).take() {
                task.abort();
            }
        }
    }

    /// Fetches a fresh copy of `id`, merges it, selects it and works out
    /// which staff can be offered.
    pub async fn open_appointment(&self, id: &RecordId) -> Result<Appointment, ApiError> {
        info!(%id, "opening appointment");

        let fetched = {
            let _loading = self.store.loading_guard();
            let _viewing = self.store.begin(Action::View);
            self.api.appointment(id).await
        };

        let fresh = match fetched {
            Ok(fresh) => fresh,
            Err(err) => {
                self.report(&err, DETAILS_FAILED);
                return Err(err);
            }
        };

        self.store.upsert_appointment(fresh.clone());
        self.store.select(fresh.clone());

        let availability = if is_assignment_locked(Some(&fresh)) {
            None
        } else {
            let roster = self.store.staff();
            Some(self.availability.check(&fresh, &roster).await)
        };
        if self
            .store
            .selected()
            .is_some_and(|selected| selected.id == fresh.id)
        {
            self.store.set_availability(availability);
        }

        self.render();
        Ok(fresh)
    }

    /// Explicit deselect. Background refresh never clears the selection.
    pub fn close_appointment(&self) {
        self.store.deselect();
        self.render();
    }
}
