// libs/doctor-cell/src/services/doctor.rs
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};

use shared_database::{DocumentStore, Filter, QueryOptions};
use shared_models::{Doctor, Record};

use crate::models::{CreateDoctorRequest, DoctorError, UpdateDoctorRequest};

pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Doctor registry over the doctor table.
pub struct DoctorService {
    doctors: Arc<dyn DocumentStore<Doctor>>,
}

impl DoctorService {
    pub fn new(doctors: Arc<dyn DocumentStore<Doctor>>) -> Self {
        Self { doctors }
    }

    #[instrument(skip(self, request))]
    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(DoctorError::InvalidInput("Name is required".to_string()));
        }

        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        fields.insert("isActive".to_string(), json!(request.is_active.unwrap_or(true)));
        if let Some(specialization) = request.specialization {
            fields.insert("specialization".to_string(), json!(specialization));
        }
        if let Some(license_number) = request.license_number {
            fields.insert("licenseNumber".to_string(), json!(license_number));
        }
        if let Some(notes) = request.notes {
            fields.insert("notes".to_string(), json!(notes));
        }

        let doctor = self.doctors.create(Value::Object(fields)).await?;
        info!("Created doctor {}", doctor.id);
        Ok(doctor)
    }

    /// Deleted doctors read as missing.
    pub async fn get_doctor(&self, id: &str) -> Result<Doctor, DoctorError> {
        self.doctors
            .get_by_id(id)
            .await?
            .filter(|doctor| !doctor.is_deleted())
            .ok_or(DoctorError::NotFound)
    }

    pub async fn update_doctor(&self, id: &str, request: UpdateDoctorRequest) -> Result<Doctor, DoctorError> {
        self.get_doctor(id).await?;
        if request.is_empty() {
            return Err(DoctorError::InvalidInput("Nothing to update".to_string()));
        }

        let mut patch = Map::new();
        if let Some(name) = request.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DoctorError::InvalidInput("Name must not be empty".to_string()));
            }
            patch.insert("name".to_string(), json!(name));
        }
        if let Some(specialization) = request.specialization {
            patch.insert("specialization".to_string(), json!(specialization));
        }
        if let Some(license_number) = request.license_number {
            patch.insert("licenseNumber".to_string(), json!(license_number));
        }
        if let Some(is_active) = request.is_active {
            patch.insert("isActive".to_string(), json!(is_active));
        }
        if let Some(notes) = request.notes {
            patch.insert("notes".to_string(), json!(notes));
        }

        let doctor = self.doctors.update(id, Value::Object(patch)).await?;
        info!("Updated doctor {}", id);
        Ok(doctor)
    }

    pub async fn delete_doctor(&self, id: &str) -> Result<(), DoctorError> {
        self.get_doctor(id).await?;
        if !self.doctors.soft_delete(id).await? {
            return Err(DoctorError::NotFound);
        }
        info!("Deleted doctor {}", id);
        Ok(())
    }

    /// Live doctors in insertion order; `active_only` also drops inactive ones.
    pub async fn list_doctors(&self, limit: Option<usize>, active_only: bool) -> Result<Vec<Doctor>, DoctorError> {
        let mut filters = vec![Filter::not_exists("deletedAt")];
        if active_only {
            filters.push(Filter::eq("isActive", true));
        }

        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let result = self
            .doctors
            .scan(Some(Filter::and(filters)), QueryOptions::limit(limit))
            .await?;
        debug!("Listed {} doctors (active only: {})", result.count, active_only);
        Ok(result.items)
    }

    /// Case-sensitive substring match on the name.
    pub async fn search_doctors(&self, name: &str) -> Result<Vec<Doctor>, DoctorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DoctorError::InvalidInput("Name is required for search".to_string()));
        }

        let filter = Filter::and([Filter::contains("name", name), Filter::not_exists("deletedAt")]);
        let result = self
            .doctors
            .scan(Some(filter), QueryOptions::limit(DEFAULT_LIST_LIMIT))
            .await?;
        Ok(result.items)
    }
}
