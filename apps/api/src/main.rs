use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::services::{AppointmentService, SystemClock};
use appointment_cell::Appointment;
use doctor_cell::services::DoctorService;
use patient_cell::services::PatientService;
use shared_config::{AppConfig, StoreBackend};
use shared_database::{DocumentStore, InMemoryStore, SupabaseClient, SupabaseStore};
use shared_models::{Doctor, Patient};
use shared_utils::AesGcmEncryptor;

use crate::router::ApiState;

type Stores = (
    Arc<dyn DocumentStore<Appointment>>,
    Arc<dyn DocumentStore<Doctor>>,
    Arc<dyn DocumentStore<Patient>>,
);

fn build_stores(config: &AppConfig) -> Stores {
    match config.store_backend {
        StoreBackend::Memory => {
            warn!("Using in-memory store, data is lost on restart");
            (
                Arc::new(InMemoryStore::new(config.appointment_table.clone())),
                Arc::new(InMemoryStore::new(config.doctor_table.clone())),
                Arc::new(InMemoryStore::new(config.patient_table.clone())),
            )
        }
        StoreBackend::Supabase => {
            let client = Arc::new(SupabaseClient::new(config));
            (
                Arc::new(SupabaseStore::new(client.clone(), config.appointment_table.clone())),
                Arc::new(SupabaseStore::new(client.clone(), config.doctor_table.clone())),
                Arc::new(SupabaseStore::new(client, config.patient_table.clone())),
            )
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic appointment API server");

    let config = AppConfig::from_env();
    if config.uses_default_encryption_key() {
        warn!("ENCRYPTION_KEY is the development default, do not use it in production");
    }

    let (appointments, doctors, patients) = build_stores(&config);
    let encryptor = Arc::new(AesGcmEncryptor::new(&config.encryption_key)?);
    let doctor_service = DoctorService::new(doctors.clone());
    let patient_service = PatientService::new(patients.clone(), encryptor.clone());
    let service = AppointmentService::new(
        appointments,
        doctors,
        patients,
        encryptor,
        Arc::new(SystemClock),
    )
    .with_scan_limits(config.search_scan_limit, config.no_show_scan_limit);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let port = config.port;
    let state = ApiState::new(
        Arc::new(config),
        Arc::new(service),
        Arc::new(doctor_service),
        Arc::new(patient_service),
    );

    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
