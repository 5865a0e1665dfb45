// libs/patient-cell/src/services/patient.rs
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use shared_database::{DocumentStore, Filter, IndexQuery, QueryOptions};
use shared_models::{Patient, Record};
use shared_utils::{mask_phone, Encryptor};

use crate::models::{CreatePatientRequest, PatientError, SearchPatientsRequest, UpdatePatientRequest};

pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const PHONE_HASH_INDEX: &str = "phoneNumberHash-index";

/// Patient registry. Phone number and SSN are encrypted at rest; the phone
/// number also carries a keyed hash so it can be looked up by equality.
pub struct PatientService {
    patients: Arc<dyn DocumentStore<Patient>>,
    encryptor: Arc<dyn Encryptor>,
}

impl PatientService {
    pub fn new(patients: Arc<dyn DocumentStore<Patient>>, encryptor: Arc<dyn Encryptor>) -> Self {
        Self { patients, encryptor }
    }

    #[instrument(skip(self, request))]
    pub async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        let name = request.name.trim();
        let phone = request.phone_number.trim();
        if name.is_empty() || phone.is_empty() {
            return Err(PatientError::InvalidInput(
                "Name and phone number are required".to_string(),
            ));
        }

        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        self.write_phone(&mut fields, phone)?;
        if let Some(birth_year_month) = request.birth_year_month {
            fields.insert("birthYearMonth".to_string(), json!(checked_birth_year_month(&birth_year_month)?));
        }
        if let Some(ssn) = non_empty(request.ssn.as_deref()) {
            fields.insert("ssn".to_string(), json!(self.encryptor.encrypt(ssn)?));
        }
        if let Some(notes) = request.notes {
            fields.insert("notes".to_string(), json!(notes));
        }

        let patient = self.patients.create(Value::Object(fields)).await?;
        info!("Created patient {} (phone {})", patient.id, mask_phone(phone));
        Ok(self.reveal(patient))
    }

    /// Deleted patients read as missing.
    pub async fn get_patient(&self, id: &str) -> Result<Patient, PatientError> {
        let patient = self.find_active(id).await?;
        Ok(self.reveal(patient))
    }

    pub async fn update_patient(&self, id: &str, request: UpdatePatientRequest) -> Result<Patient, PatientError> {
        self.find_active(id).await?;
        if request.is_empty() {
            return Err(PatientError::InvalidInput("Nothing to update".to_string()));
        }

        let mut patch = Map::new();
        if let Some(name) = &request.name {
            let name = non_empty(Some(name.as_str()))
                .ok_or_else(|| PatientError::InvalidInput("Name must not be empty".to_string()))?;
            patch.insert("name".to_string(), json!(name));
        }
        if let Some(phone) = &request.phone_number {
            let phone = non_empty(Some(phone.as_str()))
                .ok_or_else(|| PatientError::InvalidInput("Phone number must not be empty".to_string()))?;
            self.write_phone(&mut patch, phone)?;
        }
        if let Some(birth_year_month) = &request.birth_year_month {
            patch.insert("birthYearMonth".to_string(), json!(checked_birth_year_month(birth_year_month)?));
        }
        if let Some(ssn) = &request.ssn {
            // an empty value clears the stored number
            let value = match non_empty(Some(ssn.as_str())) {
                Some(ssn) => json!(self.encryptor.encrypt(ssn)?),
                None => Value::Null,
            };
            patch.insert("ssn".to_string(), value);
        }
        if let Some(notes) = request.notes {
            patch.insert("notes".to_string(), json!(notes));
        }

        let patient = self.patients.update(id, Value::Object(patch)).await?;
        info!("Updated patient {}", id);
        Ok(self.reveal(patient))
    }

    pub async fn delete_patient(&self, id: &str) -> Result<(), PatientError> {
        self.find_active(id).await?;
        if !self.patients.soft_delete(id).await? {
            return Err(PatientError::NotFound);
        }
        info!("Deleted patient {}", id);
        Ok(())
    }

    pub async fn list_patients(&self, limit: Option<usize>) -> Result<Vec<Patient>, PatientError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let result = self
            .patients
            .scan(Some(Filter::not_exists("deletedAt")), QueryOptions::limit(limit))
            .await?;
        debug!("Listed {} patients", result.count);
        Ok(self.reveal_all(result.items))
    }

    /// Exact phone number lookup through the hash index, else name substring
    /// scan. No criteria yields an empty list.
    pub async fn search_patients(&self, request: SearchPatientsRequest) -> Result<Vec<Patient>, PatientError> {
        let found = if let Some(phone) = non_empty(request.phone_number.as_deref()) {
            let query = IndexQuery::new(PHONE_HASH_INDEX)
                .key("phoneNumberHash", self.phone_hash(phone))
                .with_options(QueryOptions::limit(DEFAULT_LIST_LIMIT));
            self.patients.query_by_index(query).await?.items
        } else if let Some(name) = non_empty(request.name.as_deref()) {
            let filter = Filter::and([Filter::contains("name", name), Filter::not_exists("deletedAt")]);
            self.patients
                .scan(Some(filter), QueryOptions::limit(DEFAULT_LIST_LIMIT))
                .await?
                .items
        } else {
            return Ok(Vec::new());
        };

        let live = found.into_iter().filter(|patient| !patient.is_deleted()).collect();
        Ok(self.reveal_all(live))
    }

    async fn find_active(&self, id: &str) -> Result<Patient, PatientError> {
        self.patients
            .get_by_id(id)
            .await?
            .filter(|patient| !patient.is_deleted())
            .ok_or(PatientError::NotFound)
    }

    /// Hash of the digits only, so `010-1234-5678` and `01012345678` match.
    fn phone_hash(&self, phone: &str) -> String {
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        self.encryptor.hash(&digits)
    }

    fn write_phone(&self, fields: &mut Map<String, Value>, phone: &str) -> Result<(), PatientError> {
        if !phone.chars().any(|c| c.is_ascii_digit()) {
            return Err(PatientError::InvalidInput(
                "Phone number must contain digits".to_string(),
            ));
        }
        fields.insert("phoneNumber".to_string(), json!(self.encryptor.encrypt(phone)?));
        fields.insert("phoneNumberHash".to_string(), json!(self.phone_hash(phone)));
        Ok(())
    }

    /// Decrypts personal fields for the response and drops the search hash.
    fn reveal(&self, mut patient: Patient) -> Patient {
        patient.phone_number = patient
            .phone_number
            .as_deref()
            .and_then(|cipher| self.decrypt_field(&patient.id, "phone number", cipher));
        patient.ssn = patient
            .ssn
            .as_deref()
            .and_then(|cipher| self.decrypt_field(&patient.id, "ssn", cipher));
        patient.phone_number_hash = None;
        patient
    }

    fn reveal_all(&self, patients: Vec<Patient>) -> Vec<Patient> {
        patients.into_iter().map(|patient| self.reveal(patient)).collect()
    }

    fn decrypt_field(&self, id: &str, field: &str, cipher: &str) -> Option<String> {
        match self.encryptor.decrypt(cipher) {
            Ok(plain) => Some(plain),
            Err(e) => {
                warn!("Could not decrypt {} of patient {}: {}", field, id, e);
                None
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// `YYYYMM` with a month between 01 and 12.
fn checked_birth_year_month(value: &str) -> Result<&str, PatientError> {
    let value = value.trim();
    let valid = value.len() == 6
        && value.chars().all(|c| c.is_ascii_digit())
        && matches!(value[4..].parse::<u8>(), Ok(1..=12));
    if valid {
        Ok(value)
    } else {
        Err(PatientError::InvalidInput(
            "birthYearMonth must be in YYYYMM format".to_string(),
        ))
    }
}
