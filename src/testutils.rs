use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use crate::{
    backend::{AdminApi, AvailabilityQuery, ListQuery},
    error::ApiError,
    render::{Notice, NoticeKind, Renderer},
    types::{Appointment, AppointmentPage, Pagination, RecordId, Staff, StaffRef},
    view::ConsoleView,
};

pub struct MockAdminApiInner {
    pub calls_to_list_appointments: AtomicU64,
    pub calls_to_appointment: AtomicU64,
    pub calls_to_staff: AtomicU64,
    pub calls_to_available_staff: AtomicU64,
    pub calls_to_assign_staff: AtomicU64,
    pub calls_to_update_status: AtomicU64,
    pub list_appointments: Mutex<Result<AppointmentPage, ApiError>>,
    pub appointment: Mutex<Result<Appointment, ApiError>>,
    pub staff: Mutex<Result<Vec<Staff>, ApiError>>,
    pub available_staff: Mutex<Result<Vec<Staff>, ApiError>>,
    /// `None` echoes the request back as an updated record.
    pub command_result: Mutex<Option<Result<Appointment, ApiError>>>,
    pub last_list_query: Mutex<Option<ListQuery>>,
    pub last_availability_query: Mutex<Option<AvailabilityQuery>>,
    pub last_assignment: Mutex<Option<(RecordId, i64)>>,
    pub last_status_update: Mutex<Option<(RecordId, String)>>,
}

#[derive(Clone)]
pub struct MockAdminApi(pub Arc<MockAdminApiInner>);

impl MockAdminApiInner {
    fn new() -> Self {
        Self {
            calls_to_list_appointments: AtomicU64::default(),
            calls_to_appointment: AtomicU64::default(),
            calls_to_staff: AtomicU64::default(),
            calls_to_available_staff: AtomicU64::default(),
            calls_to_assign_staff: AtomicU64::default(),
            calls_to_update_status: AtomicU64::default(),
            list_appointments: Mutex::new(Ok(AppointmentPage {
                appointments: Vec::new(),
                pagination: Pagination::default(),
            })),
            appointment: Mutex::new(Err(ApiError::Status {
                status: 404,
                message: None,
                errors: Default::default(),
            })),
            staff: Mutex::new(Ok(Vec::new())),
            available_staff: Mutex::new(Ok(Vec::new())),
            command_result: Mutex::default(),
            last_list_query: Mutex::default(),
            last_availability_query: Mutex::default(),
            last_assignment: Mutex::default(),
            last_status_update: Mutex::default(),
        }
    }
}

impl MockAdminApi {
    pub fn new() -> Self {
        Self(Arc::new(MockAdminApiInner::new()))
    }

    pub fn with_page(appointments: Vec<Appointment>, pagination: Pagination) -> Self {
        let api = Self::new();
        *api.0.list_appointments.lock().unwrap() = Ok(AppointmentPage {
            appointments,
            pagination,
        });
        api
    }

    pub fn request_count(&self) -> u64 {
        [
            &self.0.calls_to_list_appointments,
            &self.0.calls_to_appointment,
            &self.0.calls_to_staff,
            &self.0.calls_to_available_staff,
            &self.0.calls_to_assign_staff,
            &self.0.calls_to_update_status,
        ]
        .iter()
        .map(|counter| counter.load(Ordering::SeqCst))
        .sum()
    }
}

#[async_trait]
impl AdminApi for MockAdminApi {
    async fn list_appointments(&self, query: &ListQuery) -> Result<AppointmentPage, ApiError> {
        self.0
            .calls_to_list_appointments
            .fetch_add(1, Ordering::SeqCst);
        *self.0.last_list_query.lock().unwrap() = Some(query.clone());
        self.0.list_appointments.lock().unwrap().clone()
    }

    async fn appointment(&self, _id: &RecordId) -> Result<Appointment, ApiError> {
        self.0.calls_to_appointment.fetch_add(1, Ordering::SeqCst);
        self.0.appointment.lock().unwrap().clone()
    }

    async fn staff(&self) -> Result<Vec<Staff>, ApiError> {
        self.0.calls_to_staff.fetch_add(1, Ordering::SeqCst);
        self.0.staff.lock().unwrap().clone()
    }

    async fn available_staff(&self, query: &AvailabilityQuery) -> Result<Vec<Staff>, ApiError> {
        self.0.calls_to_available_staff.fetch_add(1, Ordering::SeqCst);
        *self.0.last_availability_query.lock().unwrap() = Some(query.clone());
        self.0.available_staff.lock().unwrap().clone()
    }

    async fn assign_staff(&self, id: &RecordId, staff_id: i64) -> Result<Appointment, ApiError> {
        self.0.calls_to_assign_staff.fetch_add(1, Ordering::SeqCst);
        *self.0.last_assignment.lock().unwrap() = Some((id.clone(), staff_id));
        if let Some(result) = self.0.command_result.lock().unwrap().clone() {
            return result;
        }
        let mut updated = Appointment::new(0, "pending");
        updated.id = id.clone();
        updated.staff = Some(StaffRef {
            id: Some(RecordId::from(staff_id)),
            name: Some(format!("Staff {staff_id}")),
        });
        Ok(updated)
    }

    async fn update_status(&self, id: &RecordId, status: &str) -> Result<Appointment, ApiError> {
        self.0.calls_to_update_status.fetch_add(1, Ordering::SeqCst);
        *self.0.last_status_update.lock().unwrap() = Some((id.clone(), status.to_string()));
        if let Some(result) = self.0.command_result.lock().unwrap().clone() {
            return result;
        }
        let mut updated = Appointment::new(0, status);
        updated.id = id.clone();
        Ok(updated)
    }
}

/// Keeps every view and notice it is handed.
#[derive(Default)]
pub struct RecordingRenderer {
    pub views: Mutex<Vec<ConsoleView>>,
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingRenderer {
    pub fn last_view(&self) -> Option<ConsoleView> {
        self.views.lock().unwrap().last().cloned()
    }

    pub fn render_count(&self) -> usize {
        self.views.lock().unwrap().len()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(NoticeKind::Error)
    }

    pub fn successes(&self) -> Vec<String> {
        self.messages(NoticeKind::Success)
    }

    fn messages(&self, kind: NoticeKind) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|notice| notice.kind == kind)
            .map(|notice| notice.message.clone())
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, view: &ConsoleView) {
        self.views.lock().unwrap().push(view.clone());
    }

    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

pub fn staff_member(id: i32, name: &str) -> Staff {
    Staff {
        id: RecordId::from(id),
        name: Some(name.to_string()),
        username: None,
        email: None,
    }
}
