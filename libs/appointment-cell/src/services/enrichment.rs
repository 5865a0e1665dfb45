// libs/appointment-cell/src/services/enrichment.rs
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use shared_database::DocumentStore;
use shared_models::{Doctor, Patient, Record};

use crate::models::{Appointment, AppointmentView};

/// Attaches `doctor$`/`patient$` heads to appointments. Never fails the caller.
pub struct EnrichmentService {
    doctors: Arc<dyn DocumentStore<Doctor>>,
    patients: Arc<dyn DocumentStore<Patient>>,
}

impl EnrichmentService {
    pub fn new(doctors: Arc<dyn DocumentStore<Doctor>>, patients: Arc<dyn DocumentStore<Patient>>) -> Self {
        Self { doctors, patients }
    }

    pub async fn populate(&self, appointments: Vec<Appointment>) -> Vec<AppointmentView> {
        if appointments.is_empty() {
            return Vec::new();
        }

        let doctor_ids = distinct(appointments.iter().map(|a| Some(a.doctor_id.as_str())));
        let patient_ids = distinct(appointments.iter().map(|a| a.patient_id.as_deref()));

        let (doctors, patients) = futures::join!(
            Self::fetch_heads(self.doctors.as_ref(), &doctor_ids, Doctor::head),
            Self::fetch_heads(self.patients.as_ref(), &patient_ids, Patient::head),
        );

        appointments
            .into_iter()
            .map(|appointment| AppointmentView {
                doctor: doctors.get(&appointment.doctor_id).cloned(),
                patient: appointment
                    .patient_id
                    .as_ref()
                    .and_then(|id| patients.get(id))
                    .cloned(),
                appointment,
            })
            .collect()
    }

    async fn fetch_heads<T, H>(
        store: &dyn DocumentStore<T>,
        ids: &[String],
        head: fn(&T) -> H,
    ) -> HashMap<String, H>
    where
        T: Record,
    {
        if ids.is_empty() {
            return HashMap::new();
        }

        match store.batch_get(ids).await {
            Ok(records) => records
                .iter()
                .filter(|record| !record.is_deleted())
                .map(|record| (record.id().to_string(), head(record)))
                .collect(),
            Err(e) => {
                warn!("[{}] Batch lookup failed, leaving heads empty: {}", T::MODEL_TYPE, e);
                HashMap::new()
            }
        }
    }
}

fn distinct<'a>(ids: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.flatten()
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect()
}
