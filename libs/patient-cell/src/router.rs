// libs/patient-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::PatientService;

#[derive(Clone)]
pub struct PatientState {
    pub patients: Arc<PatientService>,
}

impl PatientState {
    pub fn new(patients: Arc<PatientService>) -> Self {
        Self { patients }
    }
}

/// Patient registry, meant to be nested under `/patients`.
pub fn patient_routes(state: PatientState) -> Router {
    Router::new()
        .route("/", post(handlers::create_patient).get(handlers::list_patients))
        .route("/search", post(handlers::search_patients))
        .route(
            "/{patient_id}",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
        .with_state(state)
}
