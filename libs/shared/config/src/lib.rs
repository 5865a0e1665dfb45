use std::env;
use std::str::FromStr;
use tracing::warn;

const DEFAULT_ENCRYPTION_KEY: &str = "default-encryption-key-change-in-production";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Supabase,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "supabase" | "postgrest" => Ok(StoreBackend::Supabase),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub stage: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub doctor_table: String,
    pub patient_table: String,
    pub appointment_table: String,
    pub encryption_key: String,
    pub search_scan_limit: usize,
    pub no_show_scan_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let stage = env::var("STAGE").unwrap_or_else(|_| {
            warn!("STAGE not set, using local");
            "local".to_string()
        });

        let config = Self {
            port: parse_or("PORT", 8809),
            store_backend: env::var("STORE_BACKEND")
                .ok()
                .and_then(|raw| match raw.parse() {
                    Ok(backend) => Some(backend),
                    Err(e) => {
                        warn!("{}, falling back to in-memory store", e);
                        None
                    }
                })
                .unwrap_or(StoreBackend::Memory),
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            doctor_table: env::var("DOCTOR_TABLE")
                .unwrap_or_else(|_| format!("appointment-doctors-{}", stage)),
            patient_table: env::var("PATIENT_TABLE")
                .unwrap_or_else(|_| format!("appointment-patients-{}", stage)),
            appointment_table: env::var("APPOINTMENT_TABLE")
                .unwrap_or_else(|_| format!("appointment-appointments-{}", stage)),
            encryption_key: env::var("ENCRYPTION_KEY")
                .unwrap_or_else(|_| {
                    warn!("ENCRYPTION_KEY not set, using development key");
                    DEFAULT_ENCRYPTION_KEY.to_string()
                }),
            search_scan_limit: parse_or("SEARCH_SCAN_LIMIT", 1000),
            no_show_scan_limit: parse_or("NO_SHOW_SCAN_LIMIT", 1000),
            stage,
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Configuration suitable for tests and local runs: in-memory store, fixed key.
    pub fn local(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            port: 0,
            store_backend: StoreBackend::Memory,
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            doctor_table: format!("appointment-doctors-{}", stage),
            patient_table: format!("appointment-patients-{}", stage),
            appointment_table: format!("appointment-appointments-{}", stage),
            encryption_key: "test-encryption-key-32-characters".to_string(),
            search_scan_limit: 1000,
            no_show_scan_limit: 1000,
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.store_backend {
            StoreBackend::Memory => true,
            StoreBackend::Supabase => {
                !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
            }
        }
    }

    pub fn uses_default_encryption_key(&self) -> bool {
        self.encryption_key == DEFAULT_ENCRYPTION_KEY
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
