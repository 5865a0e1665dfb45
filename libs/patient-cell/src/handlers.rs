// libs/patient-cell/src/handlers.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use shared_models::{AppError, Patient};

use crate::models::{
    CreatePatientRequest, PatientListResponse, SearchPatientsRequest, UpdatePatientRequest,
};
use crate::router::PatientState;

#[derive(Debug, Default, Deserialize)]
pub struct PatientListParams {
    pub limit: Option<usize>,
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<PatientState>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Patient>), AppError> {
    let patient = state.patients.create_patient(request).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<PatientState>,
    Query(params): Query<PatientListParams>,
) -> Result<Json<PatientListResponse>, AppError> {
    let patients = state.patients.list_patients(params.limit).await?;
    Ok(Json(patients.into()))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<PatientState>,
    Json(request): Json<SearchPatientsRequest>,
) -> Result<Json<PatientListResponse>, AppError> {
    let patients = state.patients.search_patients(request).await?;
    Ok(Json(patients.into()))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<PatientState>,
    Path(patient_id): Path<String>,
) -> Result<Json<Patient>, AppError> {
    let patient = state.patients.get_patient(&patient_id).await?;
    Ok(Json(patient))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<PatientState>,
    Path(patient_id): Path<String>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Patient>, AppError> {
    let patient = state.patients.update_patient(&patient_id, request).await?;
    Ok(Json(patient))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<PatientState>,
    Path(patient_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.patients.delete_patient(&patient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
