use tracing::{debug, warn};

use crate::backend::{AdminApi, AvailabilityQuery};
use crate::timestamps::parse_timestamp;
use crate::types::{Appointment, RecordId, ServiceLine, Staff};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilitySource {
    /// The server answered the availability query.
    Checked,
    /// No usable answer; the whole roster is offered.
    Roster,
}

/// Which staff can be offered for one appointment, and whether assignment
/// must be blocked.
#[derive(Debug, Clone, PartialEq)]
pub struct StaffAvailability {
    pub appointment_id: RecordId,
    pub options: Vec<Staff>,
    pub source: AvailabilitySource,
    pub selector_disabled: bool,
    pub assign_disabled: bool,
    pub no_staff_available: bool,
}

impl StaffAvailability {
    /// Fail-open result: every known staff member is selectable.
    pub fn unchecked(appointment_id: RecordId, roster: Vec<Staff>) -> Self {
        Self {
            appointment_id,
            options: roster,
            source: AvailabilitySource::Roster,
            selector_disabled: false,
            assign_disabled: false,
            no_staff_available: false,
        }
    }

    /// Server answer. An empty answer fails closed.
    pub fn checked(appointment_id: RecordId, available: Vec<Staff>) -> Self {
        let none = available.is_empty();
        Self {
            appointment_id,
            options: available,
            source: AvailabilitySource::Checked,
            selector_disabled: none,
            assign_disabled: none,
            no_staff_available: none,
        }
    }
}

pub fn total_duration_minutes(services: &[ServiceLine]) -> u32 {
    services
        .iter()
        .fold(0u32, |total, service| total.saturating_add(service.duration_minutes))
}

/// Local date, clock time and summed service duration of `appointment`.
/// `None` when it has no parseable start.
pub fn availability_query(appointment: &Appointment) -> Option<AvailabilityQuery> {
    let start = parse_timestamp(appointment.appointment_date.as_deref()?)?;
    let duration = total_duration_minutes(&appointment.services);

    Some(AvailabilityQuery {
        date: start.format("%Y-%m-%d").to_string(),
        time: start.format("%H:%M").to_string(),
        duration_minutes: (duration > 0).then_some(duration),
        appointment_id: Some(appointment.id.clone()),
    })
}

#[derive(Debug, Clone)]
pub struct AvailabilityChecker<A: AdminApi> {
    api: A,
}

impl<A: AdminApi> AvailabilityChecker<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub async fn check(&self, appointment: &Appointment, roster: &[Staff]) -> StaffAvailability {
        let Some(query) = availability_query(appointment) else {
            debug!(appointment = %appointment.id, "no parseable start, offering full roster");
            return StaffAvailability::unchecked(appointment.id.clone(), roster.to_vec());
        };

        match self.api.available_staff(&query).await {
            Ok(available) => {
                debug!(
                    appointment = %appointment.id,
                    available = available.len(),
                    "availability checked"
                );
                StaffAvailability::checked(appointment.id.clone(), available)
            }
            Err(err) => {
                warn!(appointment = %appointment.id, %err, "availability check failed, offering full roster");
                StaffAvailability::unchecked(appointment.id.clone(), roster.to_vec())
            }
        }
    }
}
