use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::availability::StaffAvailability;
use crate::types::{Appointment, Pagination, RecordId, Staff};

/// A user-triggered request whose control stays disabled while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    View,
    Assign,
    Cancel,
}

#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub appointments: Vec<Appointment>,
    pub staff: Vec<Staff>,
    pub selected: Option<Appointment>,
    pub pagination: Option<Pagination>,
    pub loading: bool,
    /// Search text currently applied to the list (after debounce).
    pub search: String,
    pub availability: Option<StaffAvailability>,
    pub in_flight: HashSet<Action>,
}

/// The single in-memory copy of what the console shows. Cloning shares the
/// same state; every mutation happens under one lock acquisition.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    state: Arc<Mutex<StoreState>>,
}

impl StateStore {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // Mutations swap whole values, so a poisoned lock still holds a consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StoreState {
        self.lock().clone()
    }

    /// Swaps in a freshly fetched page. The selection is left alone.
    pub fn replace_appointments(&self, appointments: Vec<Appointment>, pagination: Pagination) {
        let mut state = self.lock();
        state.appointments = appointments;
        state.pagination = Some(pagination);
    }

    /// Replaces the entry with the same id in place. Records outside the
    /// current page are not appended. Returns whether the list held the id.
    pub fn upsert_appointment(&self, record: Appointment) -> bool {
        let mut state = self.lock();

        if state
            .selected
            .as_ref()
            .is_some_and(|selected| selected.id == record.id)
        {
            state.selected = Some(record.clone());
        }

        match state
            .appointments
            .iter_mut()
            .find(|appointment| appointment.id == record.id)
        {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn appointments(&self) -> Vec<Appointment> {
        self.lock().appointments.clone()
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.lock().pagination
    }

    pub fn set_staff(&self, staff: Vec<Staff>) {
        self.lock().staff = staff;
    }

    pub fn staff(&self) -> Vec<Staff> {
        self.lock().staff.clone()
    }

    pub fn set_loading(&self, loading: bool) {
        self.lock().loading = loading;
    }

    #[cfg(test)]
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Raises the loading flag until the guard drops.
    pub fn loading_guard(&self) -> LoadingGuard {
        self.set_loading(true);
        LoadingGuard {
            store: self.clone(),
        }
    }

    /// Selecting a different appointment drops the availability result of
    /// the previous one.
    pub fn select(&self, appointment: Appointment) {
        let mut state = self.lock();
        if state
            .availability
            .as_ref()
            .is_some_and(|availability| availability.appointment_id != appointment.id)
        {
            state.availability = None;
        }
        state.selected = Some(appointment);
    }

    pub fn deselect(&self) {
        let mut state = self.lock();
        state.selected = None;
        state.availability = None;
    }

    pub fn selected(&self) -> Option<Appointment> {
        self.lock().selected.clone()
    }

    /// Nothing is loading and no detail view is open.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        !state.loading && state.selected.is_none()
    }

    pub fn set_search(&self, search: String) {
        self.lock().search = search;
    }

    #[cfg(test)]
    pub fn search(&self) -> String {
        self.lock().search.clone()
    }

    pub fn set_availability(&self, availability: Option<StaffAvailability>) {
        self.lock().availability = availability;
    }

    /// Availability computed for `id`, if it is still the current one.
    pub fn availability_for(&self, id: &RecordId) -> Option<StaffAvailability> {
        self.lock()
            .availability
            .clone()
            .filter(|availability| &availability.appointment_id == id)
    }

    /// Marks `action` as running until the guard drops.
    pub fn begin(&self, action: Action) -> ActionGuard {
        self.lock().in_flight.insert(action);
        ActionGuard {
            store: self.clone(),
            action,
        }
    }

    pub fn is_in_flight(&self, action: Action) -> bool {
        self.lock().in_flight.contains(&action)
    }
}

pub struct LoadingGuard {
    store: StateStore,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}

pub struct ActionGuard {
    store: StateStore,
    action: Action,
}

impl Drop for ActionGuard {
    fn drop(&mut self) {
        self.store.lock().in_flight.remove(&self.action);
    }
}
