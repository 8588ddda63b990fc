//! Pure derivation of what the console displays from a [`StoreState`]
//! snapshot.

use crate::availability::StaffAvailability;
use crate::rules::{
    assignment_lock_reason, is_cancelled, normalize_status, status_badge_color, BadgeColor,
    LockReason,
};
use crate::store::{Action, StoreState};
use crate::sync::matches_search;
use crate::timestamps::format_timestamp;
use crate::types::{Appointment, Pagination, ServiceLine, Staff};

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleView {
    pub rows: Vec<AppointmentRow>,
    pub pagination: PaginationControls,
    pub detail: Option<DetailView>,
    pub loading: bool,
    pub search: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentRow {
    pub id: String,
    pub date: String,
    pub customer: String,
    pub vehicle: String,
    pub status_label: String,
    pub badge: BadgeColor,
    pub staff: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationControls {
    pub current_page: u32,
    pub last_page: u32,
    pub previous_disabled: bool,
    pub next_disabled: bool,
}

impl PaginationControls {
    pub fn from_pagination(pagination: Option<&Pagination>) -> Self {
        let pagination = pagination.copied().unwrap_or_default();
        Self {
            current_page: pagination.current_page,
            last_page: pagination.last_page,
            previous_disabled: pagination.current_page <= 1,
            next_disabled: pagination.current_page >= pagination.last_page,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub id: String,
    pub status_label: String,
    pub date: String,
    pub end_time: String,
    pub customer: String,
    pub customer_email: String,
    pub vehicle: String,
    pub license_plate: String,
    pub staff: String,
    pub total: String,
    pub created_at: String,
    pub updated_at: String,
    pub paid_at: String,
    pub services: Vec<String>,
    pub lock_reason: Option<LockReason>,
    pub show_assign_box: bool,
    pub show_cancel: bool,
    pub staff_options: Vec<StaffOption>,
    pub selector_disabled: bool,
    pub assign_disabled: bool,
    pub no_staff_warning: bool,
    pub assign_in_flight: bool,
    pub cancel_in_flight: bool,
}

pub fn derive_view(state: &StoreState) -> ConsoleView {
    let rows = state
        .appointments
        .iter()
        .filter(|appointment| matches_search(appointment, &state.search))
        .map(appointment_row)
        .collect();

    ConsoleView {
        rows,
        pagination: PaginationControls::from_pagination(state.pagination.as_ref()),
        detail: state.selected.as_ref().map(|selected| detail_view(selected, state)),
        loading: state.loading,
        search: state.search.clone(),
    }
}

pub fn appointment_row(appointment: &Appointment) -> AppointmentRow {
    AppointmentRow {
        id: appointment.id.to_string(),
        date: format_timestamp(appointment.appointment_date.as_deref()),
        customer: or_dash(
            appointment
                .customer
                .as_ref()
                .and_then(|customer| customer.name.as_deref()),
        ),
        vehicle: or_dash(
            appointment
                .vehicle
                .as_ref()
                .and_then(|vehicle| vehicle.full_name.as_deref()),
        ),
        status_label: status_label(appointment.status.as_deref()),
        badge: status_badge_color(appointment.status.as_deref()),
        staff: staff_name(appointment),
    }
}

fn detail_view(appointment: &Appointment, state: &StoreState) -> DetailView {
    let lock_reason = assignment_lock_reason(Some(appointment));
    let availability = state
        .availability
        .as_ref()
        .filter(|availability| availability.appointment_id == appointment.id);
    let customer = appointment.customer.as_ref();
    let vehicle = appointment.vehicle.as_ref();

    DetailView {
        id: appointment.id.to_string(),
        status_label: status_label(appointment.status.as_deref()),
        date: format_timestamp(appointment.appointment_date.as_deref()),
        end_time: format_timestamp(appointment.end_time.as_deref()),
        customer: or_dash(customer.and_then(|customer| customer.name.as_deref())),
        customer_email: or_dash(customer.and_then(|customer| customer.email.as_deref())),
        vehicle: or_dash(vehicle.and_then(|vehicle| vehicle.full_name.as_deref())),
        license_plate: or_dash(vehicle.and_then(|vehicle| vehicle.license_plate.as_deref())),
        staff: staff_name(appointment),
        total: format_money(appointment.total_price),
        created_at: format_timestamp(appointment.created_at.as_deref()),
        updated_at: format_timestamp(appointment.updated_at.as_deref()),
        paid_at: format_timestamp(appointment.paid_at.as_deref()),
        services: appointment.services.iter().map(service_label).collect(),
        lock_reason,
        show_assign_box: lock_reason.is_none(),
        show_cancel: !is_cancelled(appointment.status.as_deref()),
        staff_options: staff_options(appointment, &state.staff, availability),
        selector_disabled: availability.is_some_and(|a| a.selector_disabled),
        assign_disabled: availability.is_some_and(|a| a.assign_disabled),
        no_staff_warning: availability.is_some_and(|a| a.no_staff_available),
        assign_in_flight: state.in_flight.contains(&Action::Assign),
        cancel_in_flight: state.in_flight.contains(&Action::Cancel),
    }
}

fn staff_options(
    appointment: &Appointment,
    roster: &[Staff],
    availability: Option<&StaffAvailability>,
) -> Vec<StaffOption> {
    let assigned = appointment.staff.as_ref().and_then(|staff| staff.id.as_ref());
    let candidates = availability.map_or(roster, |availability| availability.options.as_slice());

    candidates
        .iter()
        .map(|staff| StaffOption {
            value: staff.id.to_string(),
            label: staff.display_label(),
            selected: assigned == Some(&staff.id),
        })
        .collect()
}

/// `pending` → `Pending`, `in_progress` → `In_progress`, missing → `-`.
pub fn status_label(status: Option<&str>) -> String {
    let status = normalize_status(status);
    let mut chars = status.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "-".to_string(),
    }
}

pub fn format_money(value: Option<f64>) -> String {
    match value {
        Some(amount) if amount.is_finite() => format!("${amount:.2}"),
        _ => "-".to_string(),
    }
}

fn service_label(service: &ServiceLine) -> String {
    let name = service
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or("Service");
    match service.price {
        Some(price) => format!("{name} ({})", format_money(Some(price))),
        None => name.to_string(),
    }
}

fn staff_name(appointment: &Appointment) -> String {
    appointment
        .staff
        .as_ref()
        .and_then(|staff| staff.name.as_deref())
        .filter(|name| !name.is_empty())
        .unwrap_or("Unassigned")
        .to_string()
}

fn or_dash(value: Option<&str>) -> String {
    value
        .filter(|value| !value.is_empty())
        .unwrap_or("-")
        .to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{CustomerRef, RecordId, StaffRef};
    use crate::testutils::staff_member;
    use test_case::test_case;

    #[test_case(1, 1, true, true)]
    #[test_case(3, 3, false, true)]
    #[test_case(1, 2, true, false)]
    #[test_case(2, 5, false, false)]
    #[test_case(6, 5, false, true)]
    fn test_pagination_controls(current: u32, last: u32, prev_disabled: bool, next_disabled: bool) {
        let controls = PaginationControls::from_pagination(Some(&Pagination::new(current, last)));
        assert_eq!(controls.previous_disabled, prev_disabled);
        assert_eq!(controls.next_disabled, next_disabled);
    }

    #[test]
    fn test_missing_pagination_disables_both_directions() {
        let controls = PaginationControls::from_pagination(None);
        assert!(controls.previous_disabled);
        assert!(controls.next_disabled);
    }

    #[test_case(Some("pending"), "Pending")]
    #[test_case(Some("IN_PROGRESS"), "In_progress")]
    #[test_case(None, "-")]
    fn test_status_label(status: Option<&str>, expected: &str) {
        assert_eq!(status_label(status), expected);
    }

    #[test_case(Some(12.5), "$12.50")]
    #[test_case(Some(0.0), "$0.00")]
    #[test_case(None, "-")]
    fn test_format_money(value: Option<f64>, expected: &str) {
        assert_eq!(format_money(value), expected);
    }

    #[test]
    fn test_single_pending_row_scenario() {
        let state = StoreState {
            appointments: vec![Appointment::new(5, "pending")],
            pagination: Some(Pagination::new(1, 2)),
            ..Default::default()
        };

        let view = derive_view(&state);

        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].id, "5");
        assert_eq!(view.rows[0].badge, BadgeColor::Yellow);
        assert_eq!(view.rows[0].staff, "Unassigned");
        assert_eq!(view.rows[0].customer, "-");
        assert!(view.pagination.previous_disabled);
        assert!(!view.pagination.next_disabled);
        assert!(view.detail.is_none());
    }

    #[test]
    fn test_search_filters_rows_only() {
        let mut jane = Appointment::new(1, "pending");
        jane.customer = Some(CustomerRef {
            name: Some("Jane Doe".into()),
            email: None,
        });
        let state = StoreState {
            appointments: vec![jane, Appointment::new(2, "pending")],
            pagination: Some(Pagination::new(1, 1)),
            search: "jane".into(),
            ..Default::default()
        };

        let view = derive_view(&state);

        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].customer, "Jane Doe");
    }

    #[test]
    fn test_detail_hides_assignment_and_cancel_for_cancelled() {
        let cancelled = Appointment::new(3, "Cancelled");
        let state = StoreState {
            selected: Some(cancelled),
            staff: vec![staff_member(1, "Ann")],
            ..Default::default()
        };

        let detail = derive_view(&state).detail.unwrap();

        assert_eq!(detail.lock_reason, Some(LockReason::StatusLocked));
        assert!(!detail.show_assign_box);
        assert!(!detail.show_cancel);
    }

    #[test]
    fn test_detail_offers_roster_and_preselects_assignee() {
        let mut appointment = Appointment::new(3, "pending");
        appointment.services = vec![
            ServiceLine {
                name: Some("Oil change".into()),
                price: Some(49.9),
                duration_minutes: 30,
            },
            ServiceLine::default(),
        ];
        appointment.total_price = Some(49.9);
        let state = StoreState {
            selected: Some(appointment.clone()),
            staff: vec![staff_member(1, "Ann"), staff_member(2, "Bob")],
            ..Default::default()
        };

        let detail = derive_view(&state).detail.unwrap();
        assert!(detail.show_assign_box);
        assert!(detail.show_cancel);
        assert_eq!(detail.total, "$49.90");
        assert_eq!(detail.services, vec!["Oil change ($49.90)", "Service"]);
        assert_eq!(detail.staff_options.len(), 2);
        assert!(detail.staff_options.iter().all(|option| !option.selected));

        appointment.staff = Some(StaffRef {
            id: Some(RecordId::from(2)),
            name: Some("Bob".into()),
        });
        let state = StoreState {
            selected: Some(appointment),
            ..state
        };
        let detail = derive_view(&state).detail.unwrap();
        assert_eq!(detail.lock_reason, Some(LockReason::AlreadyAssigned));
        assert!(detail.staff_options[1].selected);
        assert_eq!(detail.staff, "Bob");
    }

    #[test]
    fn test_detail_reflects_empty_availability() {
        let appointment = Appointment::new(3, "pending");
        let state = StoreState {
            selected: Some(appointment),
            staff: vec![staff_member(1, "Ann")],
            availability: Some(StaffAvailability::checked(RecordId::from(3), Vec::new())),
            ..Default::default()
        };

        let detail = derive_view(&state).detail.unwrap();

        assert!(detail.staff_options.is_empty());
        assert!(detail.selector_disabled);
        assert!(detail.assign_disabled);
        assert!(detail.no_staff_warning);
    }
}
