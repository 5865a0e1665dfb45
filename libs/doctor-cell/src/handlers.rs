// libs/doctor-cell/src/handlers.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use shared_models::{AppError, Doctor};

use crate::models::{CreateDoctorRequest, DoctorListResponse, SearchDoctorsRequest, UpdateDoctorRequest};
use crate::router::DoctorState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorListParams {
    pub limit: Option<usize>,
    pub active_only: Option<String>,
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<DoctorState>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Doctor>), AppError> {
    let doctor = state.doctors.create_doctor(request).await?;
    Ok((StatusCode::CREATED, Json(doctor)))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<DoctorState>,
    Query(params): Query<DoctorListParams>,
) -> Result<Json<DoctorListResponse>, AppError> {
    let active_only = params.active_only.as_deref() == Some("true");
    let doctors = state.doctors.list_doctors(params.limit, active_only).await?;
    Ok(Json(doctors.into()))
}

#[axum::debug_handler]
pub async fn search_doctors(
    State(state): State<DoctorState>,
    Json(request): Json<SearchDoctorsRequest>,
) -> Result<Json<DoctorListResponse>, AppError> {
    let name = request.name.unwrap_or_default();
    let doctors = state.doctors.search_doctors(&name).await?;
    Ok(Json(doctors.into()))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<DoctorState>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Doctor>, AppError> {
    let doctor = state.doctors.get_doctor(&doctor_id).await?;
    Ok(Json(doctor))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<DoctorState>,
    Path(doctor_id): Path<String>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Doctor>, AppError> {
    let doctor = state.doctors.update_doctor(&doctor_id, request).await?;
    Ok(Json(doctor))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<DoctorState>,
    Path(doctor_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.doctors.delete_doctor(&doctor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
