pub mod doctor;

pub use doctor::{DoctorService, DEFAULT_LIST_LIMIT};
