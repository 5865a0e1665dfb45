// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::{AppError, DoctorHead, PatientHead, Record};
use shared_utils::CryptoError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub doctor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub booker_name: String,
    /// Ciphertext in the store, plaintext once revealed at the boundary.
    pub booker_phone: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub appointment_date_time: DateTime<FixedOffset>,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_show_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl Record for Appointment {
    const MODEL_TYPE: &'static str = "appointment";

    fn id(&self) -> &str {
        &self.id
    }

    fn deleted_at(&self) -> Option<&DateTime<FixedOffset>> {
        self.deleted_at.as_ref()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::NoShow => "NO_SHOW",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read projection: the stored record plus computed doctor/patient heads.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    #[serde(rename = "doctor$", skip_serializing_if = "Option::is_none")]
    pub doctor: Option<DoctorHead>,
    #[serde(rename = "patient$", skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientHead>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

// Missing fields default to empty so validation reports E_INVALID_INPUT
// instead of a JSON extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateAppointmentRequest {
    pub doctor_id: String,
    pub patient_id: Option<String>,
    pub booker_name: String,
    pub booker_phone: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub notes: Option<String>,
}

/// Fields a caller may change; status moves only through cancel and the sweep.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateAppointmentRequest {
    pub patient_id: Option<String>,
    pub booker_name: Option<String>,
    pub booker_phone: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub notes: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn reschedules(&self) -> bool {
        self.appointment_date.is_some() || self.appointment_time.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppointmentQuery {
    pub appointment_date: Option<String>,
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub include_all: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchAppointmentsRequest {
    pub booker_name: Option<String>,
    pub booker_phone: Option<String>,
    pub appointment_date: Option<String>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentListResponse {
    pub list: Vec<AppointmentView>,
    pub total: usize,
}

impl From<Vec<AppointmentView>> for AppointmentListResponse {
    fn from(list: Vec<AppointmentView>) -> Self {
        Self {
            total: list.len(),
            list,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelAppointmentResponse {
    pub success: bool,
}

// ==============================================================================
// SCHEDULED TRIGGER MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CronEvent {
    pub cron: Option<CronJob>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CronJob {
    pub name: String,
}

impl CronEvent {
    pub fn named(name: &str) -> Self {
        Self {
            cron: Some(CronJob {
                name: name.to_string(),
            }),
        }
    }

    pub fn job_name(&self) -> Option<&str> {
        self.cron.as_ref().map(|job| job.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CronResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub message: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidTime(String),

    #[error("Appointment time must be in the future")]
    PastTime,

    #[error("Doctor already has an appointment at this time")]
    Duplicated,

    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Encryption(#[from] CryptoError),
}

impl AppointmentError {
    pub fn code(&self) -> &'static str {
        match self {
            AppointmentError::InvalidInput(_) | AppointmentError::InvalidStatusTransition { .. } => {
                "E_INVALID_INPUT"
            }
            AppointmentError::InvalidTime(_) => "E_INVALID_TIME",
            AppointmentError::PastTime => "E_PAST_TIME",
            AppointmentError::Duplicated => "E_DUPLICATED",
            AppointmentError::NotFound => "E_NOT_FOUND",
            AppointmentError::Store(_) | AppointmentError::Encryption(_) => "E_INTERNAL",
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        let message = e.to_string();
        match e {
            AppointmentError::InvalidInput(_) | AppointmentError::InvalidStatusTransition { .. } => {
                AppError::InvalidInput(message)
            }
            AppointmentError::InvalidTime(_) => AppError::InvalidTime(message),
            AppointmentError::PastTime => AppError::PastTime(message),
            AppointmentError::Duplicated => AppError::Duplicated(message),
            AppointmentError::NotFound => AppError::NotFound(message),
            AppointmentError::Store(_) => AppError::Database(message),
            AppointmentError::Encryption(_) => AppError::Internal(message),
        }
    }
}
