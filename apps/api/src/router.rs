use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use appointment_cell::router::{appointment_routes, cron_routes, AppointmentState};
use appointment_cell::services::AppointmentService;
use doctor_cell::router::{doctor_routes, DoctorState};
use doctor_cell::services::DoctorService;
use patient_cell::router::{patient_routes, PatientState};
use patient_cell::services::PatientService;
use shared_config::AppConfig;

const SERVICE_NAME: &str = "clinic-appointment-api";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<AppConfig>,
    pub appointments: Arc<AppointmentService>,
    pub doctors: Arc<DoctorService>,
    pub patients: Arc<PatientService>,
}

impl ApiState {
    pub fn new(
        config: Arc<AppConfig>,
        appointments: Arc<AppointmentService>,
        doctors: Arc<DoctorService>,
        patients: Arc<PatientService>,
    ) -> Self {
        Self {
            config,
            appointments,
            doctors,
            patients,
        }
    }
}

pub fn create_router(state: ApiState) -> Router {
    let cell_state = AppointmentState::new(state.appointments.clone());
    let doctor_state = DoctorState::new(state.doctors.clone());
    let patient_state = PatientState::new(state.patients.clone());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/db", get(database_health))
        .with_state(state)
        .nest("/appointments", appointment_routes(cell_state.clone()))
        .nest("/cron", cron_routes(cell_state))
        .nest("/doctors", doctor_routes(doctor_state))
        .nest("/patients", patient_routes(patient_state))
}

async fn root(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": VERSION,
        "stage": state.config.stage,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "service": SERVICE_NAME,
        "version": VERSION,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Checks every table; any unreachable one turns the response into a 503.
async fn database_health(State(state): State<ApiState>) -> (StatusCode, Json<Value>) {
    let tables = state.appointments.check_tables().await;
    let healthy = tables.iter().all(|table| table.reachable);

    if !healthy {
        warn!("Database health check failed: {:?}", tables);
    }

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if healthy { "OK" } else { "DEGRADED" },
            "tables": tables,
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use appointment_cell::services::SystemClock;
    use appointment_cell::Appointment;
    use shared_database::{DocumentStore, InMemoryStore, SupabaseClient, SupabaseStore};
    use shared_models::{Doctor, Patient};
    use shared_utils::test_utils::TestConfig;
    use shared_utils::AesGcmEncryptor;

    fn app_with(
        config: AppConfig,
        appointments: Arc<dyn DocumentStore<Appointment>>,
        doctors: Arc<dyn DocumentStore<Doctor>>,
        patients: Arc<dyn DocumentStore<Patient>>,
    ) -> Router {
        let encryptor = Arc::new(AesGcmEncryptor::new(&config.encryption_key).unwrap());
        let state = ApiState::new(
            Arc::new(config),
            Arc::new(AppointmentService::new(
                appointments,
                doctors.clone(),
                patients.clone(),
                encryptor.clone(),
                Arc::new(SystemClock),
            )),
            Arc::new(DoctorService::new(doctors)),
            Arc::new(PatientService::new(patients, encryptor)),
        );
        create_router(state)
    }

    fn in_memory_app() -> Router {
        let config = TestConfig::default().to_app_config();
        app_with(
            config.clone(),
            Arc::new(InMemoryStore::new(config.appointment_table.clone())),
            Arc::new(InMemoryStore::new(config.doctor_table.clone())),
            Arc::new(InMemoryStore::new(config.patient_table.clone())),
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn root_reports_service_and_stage() {
        let (status, body) = get_json(in_memory_app(), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], SERVICE_NAME);
        assert_eq!(body["stage"], "test");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = get_json(in_memory_app(), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert_eq!(body["version"], VERSION);
    }

    #[tokio::test]
    async fn database_health_lists_tables() {
        let (status, body) = get_json(in_memory_app(), "/health/db").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tables"].as_array().unwrap().len(), 3);
        assert_eq!(body["tables"][2]["table"], "appointment-appointments-test");
    }

    #[tokio::test]
    async fn database_health_is_503_when_backend_is_down() {
        // Nothing listens on port 9, so every table check fails to connect.
        let config = TestConfig::default().supabase("http://127.0.0.1:9");
        let client = Arc::new(SupabaseClient::new(&config));
        let app = app_with(
            config.clone(),
            Arc::new(SupabaseStore::new(client.clone(), config.appointment_table.clone())),
            Arc::new(SupabaseStore::new(client.clone(), config.doctor_table.clone())),
            Arc::new(SupabaseStore::new(client, config.patient_table.clone())),
        );

        let (status, body) = get_json(app, "/health/db").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "DEGRADED");
        assert_eq!(body["tables"][0]["reachable"], false);
    }

    #[tokio::test]
    async fn appointment_routes_are_nested() {
        let (status, body) = get_json(in_memory_app(), "/appointments?appointmentDate=2030-01-01").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn registry_routes_are_nested() {
        let app = in_memory_app();

        let (status, body) = get_json(app.clone(), "/doctors").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);

        let (status, body) = get_json(app, "/patients/patient-missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "E_NOT_FOUND");
    }
}
