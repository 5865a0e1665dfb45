// libs/doctor-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::DoctorService;

#[derive(Clone)]
pub struct DoctorState {
    pub doctors: Arc<DoctorService>,
}

impl DoctorState {
    pub fn new(doctors: Arc<DoctorService>) -> Self {
        Self { doctors }
    }
}

/// Doctor registry, meant to be nested under `/doctors`.
pub fn doctor_routes(state: DoctorState) -> Router {
    Router::new()
        .route("/", post(handlers::create_doctor).get(handlers::list_doctors))
        .route("/search", post(handlers::search_doctors))
        .route(
            "/{doctor_id}",
            get(handlers::get_doctor)
                .put(handlers::update_doctor)
                .delete(handlers::delete_doctor),
        )
        .with_state(state)
}
