use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use validator::Validate;

use crate::backend::{AdminApi, AvailabilityQuery, ListQuery};
use crate::error::ApiError;
use crate::types::{
    Appointment, AppointmentData, AppointmentListData, AppointmentPage, Envelope, RecordId, Staff,
    StaffData,
};

type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Serialize, Validate)]
pub struct AssignStaffRequest {
    #[validate(range(min = 1))]
    pub staff_id: i64,
}

/// [`AdminApi`] over HTTP. Every request carries `Accept: application/json`
/// and, when a token is configured, a bearer credential.
#[derive(Clone)]
pub struct HttpAdminApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl HttpAdminApi {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url.trim()).map_err(|err| ApiError::InvalidUrl(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client: Client::new(),
            base_url,
            token: token.filter(|token| !token.trim().is_empty()),
            on_unauthorized: None,
        })
    }

    /// Runs `hook` whenever the server answers 401.
    pub fn on_unauthorized(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_unauthorized = Some(Arc::new(hook));
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                warn!(path = %url, "session rejected by the admin API");
                if let Some(hook) = &self.on_unauthorized {
                    hook();
                }
            }
            let envelope = serde_json::from_str::<Envelope<Value>>(&body).ok();
            let (message, errors) = envelope
                .map(|envelope| (envelope.message, envelope.errors.unwrap_or_default()))
                .unwrap_or_default();
            debug!(path = %url, status = status.as_u16(), "admin API request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
                errors,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))?;
        if envelope.success != Some(true) {
            return Err(ApiError::Unsuccessful {
                message: envelope.message,
                errors: envelope.errors.unwrap_or_default(),
            });
        }
        envelope.data.ok_or(ApiError::MissingField("data"))
    }

    async fn appointment_response(&self, request: RequestBuilder) -> Result<Appointment, ApiError> {
        let data: AppointmentData = self.send(request).await?;
        data.appointment.ok_or(ApiError::MissingField("appointment"))
    }

    async fn staff_response(&self, request: RequestBuilder) -> Result<Vec<Staff>, ApiError> {
        let data: StaffData = self.send(request).await?;
        data.staff.ok_or(ApiError::MissingField("staff"))
    }
}

#[async_trait]
impl AdminApi for HttpAdminApi {
    async fn list_appointments(&self, query: &ListQuery) -> Result<AppointmentPage, ApiError> {
        let request = self
            .request(Method::GET, &["admin", "appointments"])?
            .query(&query.to_pairs());
        let data: AppointmentListData = self.send(request).await?;
        let appointments = data
            .appointments
            .ok_or(ApiError::MissingField("appointments"))?;
        Ok(AppointmentPage {
            appointments,
            pagination: data.pagination.unwrap_or_default(),
        })
    }

    async fn appointment(&self, id: &RecordId) -> Result<Appointment, ApiError> {
        let request = self.request(Method::GET, &["admin", "appointments", id.as_str()])?;
        self.appointment_response(request).await
    }

    async fn staff(&self) -> Result<Vec<Staff>, ApiError> {
        let request = self.request(Method::GET, &["admin", "staff"])?;
        self.staff_response(request).await
    }

    async fn available_staff(&self, query: &AvailabilityQuery) -> Result<Vec<Staff>, ApiError> {
        let request = self
            .request(Method::GET, &["admin", "staff", "available"])?
            .query(&query.to_pairs());
        self.staff_response(request).await
    }

    async fn assign_staff(&self, id: &RecordId, staff_id: i64) -> Result<Appointment, ApiError> {
        let request = self
            .request(
                Method::POST,
                &["admin", "appointments", id.as_str(), "assign-staff"],
            )?
            .json(&AssignStaffRequest { staff_id });
        self.appointment_response(request).await
    }

    async fn update_status(&self, id: &RecordId, status: &str) -> Result<Appointment, ApiError> {
        let request = self
            .request(
                Method::PATCH,
                &["admin", "appointments", id.as_str(), "status"],
            )?
            .json(&json!({ "status": status }));
        self.appointment_response(request).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::extract::{Path, RawQuery, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, patch, post};
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recorded(Arc<Mutex<Vec<String>>>);

    impl Recorded {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{address}/api")
    }

    async fn list_appointments(
        State(recorded): State<Recorded>,
        headers: HeaderMap,
        RawQuery(query): RawQuery,
    ) -> Json<Value> {
        let authorization = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        recorded.push(format!("{authorization}|{}", query.unwrap_or_default()));
        Json(json!({
            "success": true,
            "data": {
                "appointments": [
                    { "id": 5, "status": "pending", "total_price": "19.50" },
                    { "id": 6, "status": "Completed", "user": { "name": "Jane Doe" } }
                ],
                "pagination": { "current_page": 2, "last_page": 4 }
            }
        }))
    }

    async fn assign_staff(
        State(recorded): State<Recorded>,
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        recorded.push(format!("assign {id} {body}"));
        Json(json!({
            "success": true,
            "data": {
                "appointment": {
                    "id": id,
                    "status": "pending",
                    "staff": { "id": body["staff_id"], "name": "Mike" }
                }
            }
        }))
    }

    async fn update_status(Path(id): Path<String>, Json(body): Json<Value>) -> Json<Value> {
        Json(json!({
            "success": true,
            "data": { "appointment": { "id": id, "status": body["status"] } }
        }))
    }

    async fn missing_appointment() -> (AxumStatus, Json<Value>) {
        (
            AxumStatus::NOT_FOUND,
            Json(json!({ "success": false, "message": "Appointment not found" })),
        )
    }

    async fn rejected_staff() -> Json<Value> {
        Json(json!({
            "success": false,
            "message": "Validation failed",
            "errors": { "date": ["The date field is required."] }
        }))
    }

    async fn unauthenticated() -> (AxumStatus, Json<Value>) {
        (
            AxumStatus::UNAUTHORIZED,
            Json(json!({ "message": "Unauthenticated." })),
        )
    }

    async fn empty_payload() -> Json<Value> {
        Json(json!({ "success": true, "data": {} }))
    }

    fn router(recorded: Recorded) -> Router {
        Router::new()
            .route("/api/admin/appointments", get(list_appointments))
            .route("/api/admin/appointments/:id", get(missing_appointment))
            .route(
                "/api/admin/appointments/:id/assign-staff",
                post(assign_staff),
            )
            .route("/api/admin/appointments/:id/status", patch(update_status))
            .route("/api/admin/staff", get(unauthenticated))
            .route("/api/admin/staff/available", get(rejected_staff))
            .with_state(recorded)
    }

    async fn init() -> (HttpAdminApi, Recorded) {
        let recorded = Recorded::default();
        let base_url = spawn_server(router(recorded.clone())).await;
        let api = HttpAdminApi::new(&base_url, Some("secret-token".into())).unwrap();
        (api, recorded)
    }

    #[tokio::test]
    async fn test_list_appointments_sends_credentials_and_filters() {
        let (api, recorded) = init().await;

        let query = ListQuery {
            status: Some("pending".into()),
            page: Some(2),
        };
        let page = api.list_appointments(&query).await.unwrap();

        assert_eq!(page.appointments.len(), 2);
        assert_eq!(page.appointments[0].total_price, Some(19.5));
        assert_eq!(
            page.appointments[1]
                .customer
                .as_ref()
                .and_then(|customer| customer.name.as_deref()),
            Some("Jane Doe")
        );
        assert_eq!(page.pagination.current_page, 2);
        assert_eq!(page.pagination.last_page, 4);
        assert_eq!(
            recorded.entries(),
            vec!["Bearer secret-token|status=pending&page=2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_list_appointments_without_filters_sends_no_query() {
        let (api, recorded) = init().await;

        api.list_appointments(&ListQuery::default()).await.unwrap();

        assert_eq!(recorded.entries(), vec!["Bearer secret-token|".to_string()]);
    }

    #[tokio::test]
    async fn test_assign_staff_posts_integer_id() {
        let (api, recorded) = init().await;

        let updated = api.assign_staff(&RecordId::from(12), 3).await.unwrap();

        assert_eq!(updated.id, RecordId::from(12));
        assert_eq!(
            updated.staff.and_then(|staff| staff.id),
            Some(RecordId::from(3))
        );
        assert_eq!(recorded.entries(), vec![r#"assign 12 {"staff_id":3}"#.to_string()]);
    }

    #[tokio::test]
    async fn test_update_status_patches_status() {
        let (api, _) = init().await;

        let updated = api
            .update_status(&RecordId::from(12), "cancelled")
            .await
            .unwrap();

        assert_eq!(updated.status.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn test_not_found_keeps_server_message() {
        let (api, _) = init().await;

        let err = api.appointment(&RecordId::from(99)).await.unwrap_err();

        assert_eq!(
            err,
            ApiError::Status {
                status: 404,
                message: Some("Appointment not found".into()),
                errors: Default::default(),
            }
        );
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_is_an_error() {
        let (api, _) = init().await;
        let query = AvailabilityQuery {
            date: "2025-03-14".into(),
            time: "09:30".into(),
            duration_minutes: None,
            appointment_id: None,
        };

        let err = api.available_staff(&query).await.unwrap_err();

        assert_eq!(err.server_message(), Some("Validation failed"));
        assert_eq!(err.field_error("date"), Some("The date field is required."));
    }

    #[tokio::test]
    async fn test_unauthorized_runs_hook() {
        let (api, _) = init().await;
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let api = api.on_unauthorized(move || flag.store(true, Ordering::SeqCst));

        let err = api.staff().await.unwrap_err();

        assert!(err.is_unauthorized());
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_missing_expected_field_is_an_error() {
        let recorded = Recorded::default();
        let router = Router::new()
            .route("/api/admin/appointments/:id", get(empty_payload))
            .with_state(recorded);
        let base_url = spawn_server(router).await;
        let api = HttpAdminApi::new(&base_url, None).unwrap();

        let err = api.appointment(&RecordId::from(1)).await.unwrap_err();

        assert_eq!(err, ApiError::MissingField("appointment"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);
        let api = HttpAdminApi::new(&format!("http://{address}/api"), None).unwrap();

        let err = api.staff().await.unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Network);
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = HttpAdminApi::new("https://example.com/api/", None).unwrap();
        let url = api
            .endpoint(&["admin", "appointments", "7", "assign-staff"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/api/admin/appointments/7/assign-staff"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpAdminApi::new("not a url", None),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
