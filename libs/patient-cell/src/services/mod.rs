pub mod patient;

pub use patient::{PatientService, DEFAULT_LIST_LIMIT, PHONE_HASH_INDEX};
