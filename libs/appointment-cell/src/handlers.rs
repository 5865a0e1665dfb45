// libs/appointment-cell/src/handlers.rs
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use shared_models::AppError;

use crate::models::{
    Appointment, AppointmentListResponse, AppointmentQuery, AppointmentView,
    CancelAppointmentRequest, CancelAppointmentResponse, CreateAppointmentRequest, CronEvent,
    CronResult, SearchAppointmentsRequest, UpdateAppointmentRequest,
};
use crate::router::AppointmentState;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentQueryParams {
    pub appointment_date: Option<String>,
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub include_all: Option<String>,
}

impl From<AppointmentQueryParams> for AppointmentQuery {
    fn from(params: AppointmentQueryParams) -> Self {
        Self {
            appointment_date: params.appointment_date,
            doctor_id: params.doctor_id,
            patient_id: params.patient_id,
            include_all: params.include_all.as_deref() == Some("true"),
        }
    }
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppointmentState>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = state.appointments.create_appointment(request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn query_appointments(
    State(state): State<AppointmentState>,
    Query(params): Query<AppointmentQueryParams>,
) -> Result<Json<AppointmentListResponse>, AppError> {
    let appointments = state.appointments.query_appointments(params.into()).await?;
    Ok(Json(appointments.into()))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<AppointmentState>,
    Json(request): Json<SearchAppointmentsRequest>,
) -> Result<Json<AppointmentListResponse>, AppError> {
    let appointments = state.appointments.search_appointments(request).await?;
    Ok(Json(appointments.into()))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<String>,
) -> Result<Json<AppointmentView>, AppError> {
    let appointment = state.appointments.get_appointment(&appointment_id).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<String>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state
        .appointments
        .update_appointment(&appointment_id, request)
        .await?;
    Ok(Json(appointment))
}

/// The body is optional; an empty one cancels without a reason.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<String>,
    body: Bytes,
) -> Result<Json<CancelAppointmentResponse>, AppError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CancelAppointmentRequest::default()
    } else {
        serde_json::from_slice::<CancelAppointmentRequest>(&body)
            .map_err(|e| AppError::InvalidInput(format!("Invalid cancel body: {}", e)))?
    };

    let success = state
        .appointments
        .cancel_appointment(&appointment_id, request.reason)
        .await?;
    Ok(Json(CancelAppointmentResponse { success }))
}

// ==============================================================================
// SCHEDULED TRIGGER
// ==============================================================================

#[axum::debug_handler]
pub async fn handle_cron_event(
    State(state): State<AppointmentState>,
    Json(event): Json<CronEvent>,
) -> Result<Json<CronResult>, AppError> {
    let result = state.sweeper.handle_event(&event).await?;
    Ok(Json(result))
}
