// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::{AppointmentService, NoShowSweeper};

#[derive(Clone)]
pub struct AppointmentState {
    pub appointments: Arc<AppointmentService>,
    pub sweeper: Arc<NoShowSweeper>,
}

impl AppointmentState {
    pub fn new(appointments: Arc<AppointmentService>) -> Self {
        Self {
            sweeper: Arc::new(NoShowSweeper::new(appointments.clone())),
            appointments,
        }
    }
}

/// Appointment surface, meant to be nested under `/appointments`.
pub fn appointment_routes(state: AppointmentState) -> Router {
    Router::new()
        .route(
            "/",
            post(handlers::create_appointment).get(handlers::query_appointments),
        )
        .route("/search", post(handlers::search_appointments))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).put(handlers::update_appointment),
        )
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .with_state(state)
}

/// Scheduled trigger endpoint, meant to be nested under `/cron`.
pub fn cron_routes(state: AppointmentState) -> Router {
    Router::new()
        .route("/", post(handlers::handle_cron_event))
        .with_state(state)
}
