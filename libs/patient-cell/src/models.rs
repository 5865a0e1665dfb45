// libs/patient-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::{AppError, Patient};
use shared_utils::CryptoError;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePatientRequest {
    pub name: String,
    pub phone_number: String,
    pub birth_year_month: Option<String>,
    pub ssn: Option<String>,
    pub notes: Option<String>,
}

/// Only the fields present are written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub birth_year_month: Option<String>,
    pub ssn: Option<String>,
    pub notes: Option<String>,
}

impl UpdatePatientRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone_number.is_none()
            && self.birth_year_month.is_none()
            && self.ssn.is_none()
            && self.notes.is_none()
    }
}

/// Phone number wins over name when both are given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchPatientsRequest {
    pub name: Option<String>,
    pub phone_number: Option<String>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PatientListResponse {
    pub items: Vec<Patient>,
    pub count: usize,
}

impl From<Vec<Patient>> for PatientListResponse {
    fn from(items: Vec<Patient>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Patient not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Encryption(#[from] CryptoError),
}

impl From<PatientError> for AppError {
    fn from(e: PatientError) -> Self {
        let message = e.to_string();
        match e {
            PatientError::InvalidInput(_) => AppError::InvalidInput(message),
            PatientError::NotFound => AppError::NotFound(message),
            PatientError::Store(_) => AppError::Database(message),
            PatientError::Encryption(_) => AppError::Internal(message),
        }
    }
}
