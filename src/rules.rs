//! Appointment status lifecycle and staff-assignment eligibility.
//!
//! Everything here is a pure function over an [`Appointment`]; callers
//! re-evaluate after every merge instead of caching the result.

use serde_json::Value;

use crate::types::Appointment;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

/// Statuses that close an appointment for staff assignment. Statuses outside
/// this set (including ones the console does not know yet) stay open.
pub const ASSIGNMENT_LOCKED_STATUSES: [&str; 3] =
    [STATUS_IN_PROGRESS, STATUS_COMPLETED, STATUS_CANCELLED];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeColor {
    Green,
    Yellow,
    Blue,
}

impl BadgeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeColor::Green => "green",
            BadgeColor::Yellow => "yellow",
            BadgeColor::Blue => "blue",
        }
    }
}

/// Why staff assignment is currently disallowed. Variants are listed in
/// evaluation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    MissingAppointment,
    AlreadyAssigned,
    StatusLocked,
}

impl LockReason {
    pub fn code(&self) -> &'static str {
        match self {
            LockReason::MissingAppointment => "missing_appointment",
            LockReason::AlreadyAssigned => "already_assigned",
            LockReason::StatusLocked => "status_locked",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LockReason::MissingAppointment => "No appointment selected.",
            LockReason::AlreadyAssigned => "A staff member is already assigned to this appointment.",
            LockReason::StatusLocked => {
                "Staff cannot be assigned once an appointment is in progress, completed or cancelled."
            }
        }
    }
}

pub fn normalize_status(status: Option<&str>) -> String {
    status.map(str::to_lowercase).unwrap_or_default()
}

pub fn status_badge_color(status: Option<&str>) -> BadgeColor {
    match normalize_status(status).as_str() {
        STATUS_COMPLETED => BadgeColor::Green,
        STATUS_PENDING => BadgeColor::Yellow,
        _ => BadgeColor::Blue,
    }
}

pub fn has_assigned_staff(appointment: &Appointment) -> bool {
    let staff_ref = appointment
        .staff
        .as_ref()
        .and_then(|staff| staff.id.as_ref())
        .is_some_and(|id| !id.as_str().is_empty());

    staff_ref || appointment.staff_id.as_ref().is_some_and(is_truthy)
}

pub fn is_assignment_locked_by_status(status: Option<&str>) -> bool {
    ASSIGNMENT_LOCKED_STATUSES.contains(&normalize_status(status).as_str())
}

pub fn is_cancelled(status: Option<&str>) -> bool {
    normalize_status(status) == STATUS_CANCELLED
}

pub fn assignment_lock_reason(appointment: Option<&Appointment>) -> Option<LockReason> {
    let Some(appointment) = appointment else {
        return Some(LockReason::MissingAppointment);
    };

    if has_assigned_staff(appointment) {
        return Some(LockReason::AlreadyAssigned);
    }

    if is_assignment_locked_by_status(appointment.status.as_deref()) {
        return Some(LockReason::StatusLocked);
    }

    None
}

pub fn is_assignment_locked(appointment: Option<&Appointment>) -> bool {
    assignment_lock_reason(appointment).is_some()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
