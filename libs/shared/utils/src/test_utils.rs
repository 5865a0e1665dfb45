use std::sync::Arc;

use serde_json::json;

use shared_config::{AppConfig, StoreBackend};

pub struct TestConfig {
    pub stage: String,
    pub encryption_key: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            stage: "test".to_string(),
            encryption_key: "test-encryption-key-32-characters".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            encryption_key: self.encryption_key.clone(),
            ..AppConfig::local(&self.stage)
        }
    }

    /// Same as [`TestConfig::to_app_config`] but pointed at a PostgREST server.
    pub fn supabase(&self, base_url: &str) -> AppConfig {
        AppConfig {
            store_backend: StoreBackend::Supabase,
            supabase_url: base_url.to_string(),
            ..self.to_app_config()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Rows shaped the way the appointment tables store them.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_row(id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "specialization": "Korean Medicine",
            "isActive": true,
            "createdAt": "2025-01-01T00:00:00+00:00",
            "updatedAt": "2025-01-01T00:00:00+00:00"
        })
    }

    pub fn patient_row(id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "createdAt": "2025-01-01T00:00:00+00:00",
            "updatedAt": "2025-01-01T00:00:00+00:00"
        })
    }

    /// Confirmed appointment; `booker_phone` must already be ciphertext.
    pub fn appointment_row(
        id: &str,
        doctor_id: &str,
        date: &str,
        time: &str,
        booker_phone: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "doctorId": doctor_id,
            "bookerName": "Hong Gildong",
            "bookerPhone": booker_phone,
            "appointmentDate": date,
            "appointmentTime": time,
            "appointmentDateTime": format!("{}T{}:00+09:00", date, time),
            "status": "CONFIRMED",
            "createdAt": "2025-01-01T00:00:00+00:00",
            "updatedAt": "2025-01-01T00:00:00+00:00"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code,
            "details": null,
            "hint": null
        })
    }
}
