use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A document persisted through the shared document store.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Prefix used for generated ids and in log lines.
    const MODEL_TYPE: &'static str;

    fn id(&self) -> &str;

    fn deleted_at(&self) -> Option<&DateTime<FixedOffset>>;

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl Doctor {
    pub fn head(&self) -> DoctorHead {
        DoctorHead {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

impl Record for Doctor {
    const MODEL_TYPE: &'static str = "doctor";

    fn id(&self) -> &str {
        &self.id
    }

    fn deleted_at(&self) -> Option<&DateTime<FixedOffset>> {
        self.deleted_at.as_ref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub name: String,
    /// Ciphertext in the store, plaintext once revealed at the boundary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Keyed hash of the plaintext phone number, for equality search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number_hash: Option<String>,
    /// `YYYYMM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_year_month: Option<String>,
    /// Resident registration number, encrypted like the phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl Patient {
    pub fn head(&self) -> PatientHead {
        PatientHead {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

impl Record for Patient {
    const MODEL_TYPE: &'static str = "patient";

    fn id(&self) -> &str {
        &self.id
    }

    fn deleted_at(&self) -> Option<&DateTime<FixedOffset>> {
        self.deleted_at.as_ref()
    }
}

/// Minimal doctor projection attached to read views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorHead {
    pub id: String,
    pub name: String,
}

/// Minimal patient projection attached to read views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientHead {
    pub id: String,
    pub name: String,
}
