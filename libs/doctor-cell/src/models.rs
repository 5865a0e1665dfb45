// libs/doctor-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::{AppError, Doctor};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    /// Absent means active.
    pub is_active: Option<bool>,
    pub notes: Option<String>,
}

/// Only the fields present are written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub is_active: Option<bool>,
    pub notes: Option<String>,
}

impl UpdateDoctorRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.specialization.is_none()
            && self.license_number.is_none()
            && self.is_active.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchDoctorsRequest {
    pub name: Option<String>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DoctorListResponse {
    pub items: Vec<Doctor>,
    pub count: usize,
}

impl From<Vec<Doctor>> for DoctorListResponse {
    fn from(items: Vec<Doctor>) -> Self {
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
pub enum DoctorError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Doctor not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DoctorError> for AppError {
    fn from(e: DoctorError) -> Self {
        let message = e.to_string();
        match e {
            DoctorError::InvalidInput(_) => AppError::InvalidInput(message),
            DoctorError::NotFound => AppError::NotFound(message),
            DoctorError::Store(_) => AppError::Database(message),
        }
    }
}
