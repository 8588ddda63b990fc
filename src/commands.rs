use std::sync::Arc;

use tracing::{debug, info, warn};
use validator::Validate;

use crate::backend::AdminApi;
use crate::error::{CommandError, FailureMessages, MessagePriority, ValidationError};
use crate::http_client::AssignStaffRequest;
use crate::render::{publish, Notice, Renderer};
use crate::rules::{assignment_lock_reason, is_cancelled, STATUS_CANCELLED};
use crate::store::{Action, StateStore};
use crate::types::Appointment;

pub const ASSIGN_SUCCESS: &str = "Staff assigned successfully.";
pub const CANCEL_SUCCESS: &str = "Appointment cancelled successfully.";

pub const ASSIGN_FAILURES: FailureMessages = FailureMessages {
    field: "staff_id",
    not_found: "Appointment or staff member not found.",
    forbidden: "You do not have permission to assign staff.",
    server: "Server error while assigning staff. Please try again.",
    network: "Network error while assigning staff. Please check your connection.",
    fallback: "Failed to assign staff.",
    priority: MessagePriority::ServerFirst,
};

pub const CANCEL_FAILURES: FailureMessages = FailureMessages {
    field: "status",
    not_found: "Appointment not found.",
    forbidden: "You do not have permission to cancel this appointment.",
    server: "Server error while cancelling the appointment. Please try again.",
    network: "Network error while cancelling the appointment. Please check your connection.",
    fallback: "Failed to cancel appointment.",
    priority: MessagePriority::StatusFirst,
};

/// Runs the two mutating admin actions against the selected appointment.
///
/// Every failure, local or remote, is reported to the renderer as exactly
/// one error notice, except for an expired session.
pub struct CommandExecutor<A: AdminApi, R: Renderer> {
    api: A,
    store: StateStore,
    renderer: Arc<R>,
}

impl<A: AdminApi, R: Renderer> CommandExecutor<A, R> {
    pub fn new(api: A, store: StateStore, renderer: Arc<R>) -> Self {
        Self {
            api,
            store,
            renderer,
        }
    }

    /// Assigns `staff_id` (as typed or picked) to the selected appointment.
    pub async fn assign_staff(&self, staff_id: &str) -> Result<Appointment, CommandError> {
        let result = self.try_assign_staff(staff_id).await;
        self.conclude(&result, ASSIGN_SUCCESS);
        result
    }

    async fn try_assign_staff(&self, staff_id: &str) -> Result<Appointment, CommandError> {
        let selected = self.store.selected().ok_or(ValidationError::NoSelection)?;
        if let Some(reason) = assignment_lock_reason(Some(&selected)) {
            debug!(appointment = %selected.id, reason = reason.code(), "assignment locked");
            return Err(ValidationError::AssignmentLocked(reason).into());
        }
        if self
            .store
            .availability_for(&selected.id)
            .is_some_and(|availability| availability.assign_disabled)
        {
            return Err(ValidationError::AvailabilityBlocked.into());
        }

        let raw = staff_id.trim();
        if raw.is_empty() {
            return Err(ValidationError::MissingStaff.into());
        }
        let request = raw
            .parse::<i64>()
            .ok()
            .map(|staff_id| AssignStaffRequest { staff_id })
            .filter(|request| request.validate().is_ok())
            .ok_or_else(|| ValidationError::MalformedStaffId(raw.to_string()))?;

        if self.store.is_in_flight(Action::Assign) {
            return Err(ValidationError::Busy.into());
        }
        let updated = {
            let _assigning = self.store.begin(Action::Assign);
            publish(&self.store, self.renderer.as_ref());
            info!(appointment = %selected.id, staff_id = request.staff_id, "assigning staff");
            self.api.assign_staff(&selected.id, request.staff_id).await
        }
        .map_err(|err| CommandError::from_api(err, &ASSIGN_FAILURES))?;

        self.apply(updated.clone());
        Ok(updated)
    }

    /// Cancels the selected appointment.
    pub async fn cancel_appointment(&self) -> Result<Appointment, CommandError> {
        let result = self.try_cancel_appointment().await;
        self.conclude(&result, CANCEL_SUCCESS);
        result
    }

    async fn try_cancel_appointment(&self) -> Result<Appointment, CommandError> {
        let selected = self.store.selected().ok_or(ValidationError::NoSelection)?;
        if is_cancelled(selected.status.as_deref()) {
            return Err(ValidationError::AlreadyCancelled.into());
        }

        if self.store.is_in_flight(Action::Cancel) {
            return Err(ValidationError::Busy.into());
        }
        let updated = {
            let _cancelling = self.store.begin(Action::Cancel);
            publish(&self.store, self.renderer.as_ref());
            info!(appointment = %selected.id, "cancelling appointment");
            self.api.update_status(&selected.id, STATUS_CANCELLED).await
        }
        .map_err(|err| CommandError::from_api(err, &CANCEL_FAILURES))?;

        self.apply(updated.clone());
        Ok(updated)
    }

    fn apply(&self, updated: Appointment) {
        self.store.upsert_appointment(updated.clone());
        self.store.select(updated);
    }

    fn conclude(&self, result: &Result<Appointment, CommandError>, success: &str) {
        match result {
            Ok(_) => {
                publish(&self.store, self.renderer.as_ref());
                self.renderer.notify(&Notice::success(success));
            }
            Err(err) => match err.user_message() {
                Some(message) => {
                    warn!(%err, "command failed");
                    publish(&self.store, self.renderer.as_ref());
                    self.renderer.notify(&Notice::error(message));
                }
                None => debug!("command rejected as unauthorized"),
            },
        }
    }
}
