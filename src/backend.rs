use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{Appointment, AppointmentPage, RecordId, Staff};

/// Query for `GET /admin/appointments`. Absent fields never reach the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
}

impl ListQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = &self.status {
            pairs.push(("status", status.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        pairs
    }
}

/// Query for `GET /admin/staff/available`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityQuery {
    pub date: String,
    pub time: String,
    pub duration_minutes: Option<u32>,
    pub appointment_id: Option<RecordId>,
}

impl AvailabilityQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("date", self.date.clone()), ("time", self.time.clone())];
        if let Some(duration) = self.duration_minutes {
            pairs.push(("duration_minutes", duration.to_string()));
        }
        if let Some(id) = &self.appointment_id {
            pairs.push(("appointment_id", id.to_string()));
        }
        pairs
    }
}

/// The admin REST surface the console talks to.
#[async_trait]
pub trait AdminApi: Clone + Send + Sync + 'static {
    async fn list_appointments(&self, query: &ListQuery) -> Result<AppointmentPage, ApiError>;
    async fn appointment(&self, id: &RecordId) -> Result<Appointment, ApiError>;
    async fn staff(&self) -> Result<Vec<Staff>, ApiError>;
    async fn available_staff(&self, query: &AvailabilityQuery) -> Result<Vec<Staff>, ApiError>;
    async fn assign_staff(&self, id: &RecordId, staff_id: i64) -> Result<Appointment, ApiError>;
    async fn update_status(&self, id: &RecordId, status: &str) -> Result<Appointment, ApiError>;
}
