use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{collections::HashMap, fmt};

pub type FieldErrors = HashMap<String, Vec<String>>;

/// Server-issued identifier. The API sends either numbers or strings, so ids
/// are kept in their textual form and compared as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
impl From<i32> for RecordId {
    fn from(id: i32) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(id) => Self::from(id),
            Raw::Text(id) => Self(id),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomerRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleRef {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub license_plate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffRef {
    /// `0`, `false` and `""` mean no staff member.
    #[serde(default, deserialize_with = "assigned_id")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceLine {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_minutes")]
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AppointmentWire")]
pub struct Appointment {
    pub id: RecordId,
    pub status: Option<String>,
    pub appointment_date: Option<String>,
    pub end_time: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub paid_at: Option<String>,
    pub customer: Option<CustomerRef>,
    pub vehicle: Option<VehicleRef>,
    pub staff: Option<StaffRef>,
    /// Raw foreign key some endpoints send instead of (or next to) `staff`.
    pub staff_id: Option<Value>,
    pub services: Vec<ServiceLine>,
    pub total_price: Option<f64>,
}

/// Appointment as the API sends it. The customer arrives as `user`, and
/// some endpoints also send `customer`; `user` wins when both are present.
#[derive(Deserialize)]
struct AppointmentWire {
    id: RecordId,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    appointment_date: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    paid_at: Option<String>,
    #[serde(default)]
    user: Option<CustomerRef>,
    #[serde(default)]
    customer: Option<CustomerRef>,
    #[serde(default)]
    vehicle: Option<VehicleRef>,
    #[serde(default)]
    staff: Option<StaffRef>,
    #[serde(default)]
    staff_id: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    services: Vec<ServiceLine>,
    #[serde(default, deserialize_with = "lenient_number")]
    total_price: Option<f64>,
}

impl From<AppointmentWire> for Appointment {
    fn from(wire: AppointmentWire) -> Self {
        Self {
            id: wire.id,
            status: wire.status,
            appointment_date: wire.appointment_date,
            end_time: wire.end_time,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            paid_at: wire.paid_at,
            customer: wire.user.or(wire.customer),
            vehicle: wire.vehicle,
            staff: wire.staff,
            staff_id: wire.staff_id,
            services: wire.services,
            total_price: wire.total_price,
        }
    }
}

#[cfg(test)]
impl Appointment {
    pub fn new(id: impl Into<RecordId>, status: &str) -> Self {
        Self {
            id: id.into(),
            status: Some(status.to_string()),
            appointment_date: None,
            end_time: None,
            created_at: None,
            updated_at: None,
            paid_at: None,
            customer: None,
            vehicle: None,
            staff: None,
            staff_id: None,
            services: Vec::new(),
            total_price: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: RecordId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Staff {
    /// First non-empty of name, username, email; otherwise `Staff #<id>`.
    pub fn display_label(&self) -> String {
        [&self.name, &self.username, &self.email]
            .into_iter()
            .flatten()
            .find(|label| !label.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("Staff #{}", self.id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "first_page", deserialize_with = "lenient_page")]
    pub current_page: u32,
    #[serde(default = "first_page", deserialize_with = "lenient_page")]
    pub last_page: u32,
}

impl Pagination {
    pub fn new(current_page: u32, last_page: u32) -> Self {
        Self {
            current_page,
            last_page,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// One page of the filtered appointment listing.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentPage {
    pub appointments: Vec<Appointment>,
    pub pagination: Pagination,
}

/// `{success, data, message, errors}` wrapper every admin endpoint responds with.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<FieldErrors>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentListData {
    #[serde(default)]
    pub appointments: Option<Vec<Appointment>>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentData {
    #[serde(default)]
    pub appointment: Option<Appointment>,
}

#[derive(Debug, Deserialize)]
pub struct StaffData {
    #[serde(default)]
    pub staff: Option<Vec<Staff>>,
}

fn first_page() -> u32 {
    1
}

fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

fn assigned_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<RecordId>, D::Error> {
    let id = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) if number.as_f64() != Some(0.0) => {
            Some(RecordId::new(number.to_string()))
        }
        Some(Value::String(text)) if !text.is_empty() => Some(RecordId::new(text)),
        _ => None,
    };
    Ok(id)
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

fn lenient_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let minutes = lenient_number(deserializer)?.unwrap_or(0.0);
    if minutes <= 0.0 {
        return Ok(0);
    }
    Ok(minutes.round().min(u32::MAX as f64) as u32)
}

fn lenient_page<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let page = lenient_number(deserializer)?.unwrap_or(1.0);
    Ok(page.max(1.0).min(u32::MAX as f64) as u32)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
