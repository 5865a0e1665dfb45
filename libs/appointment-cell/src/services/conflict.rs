// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, warn};

use shared_database::{DocumentStore, IndexQuery, QueryOptions, QueryResult};
use shared_models::Record;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::slot_clock::to_clinic_time;

pub const DOCTOR_DATE_INDEX: &str = "doctorId-appointmentDate-index";
pub const PATIENT_DATE_INDEX: &str = "patientId-appointmentDate-index";
pub const DATE_INDEX: &str = "appointmentDate-index";

/// Follows `next_token` until the index query is exhausted.
pub async fn collect_index(
    store: &dyn DocumentStore<Appointment>,
    query: IndexQuery,
) -> Result<Vec<Appointment>, AppointmentError> {
    let mut items = Vec::new();
    let mut options = query.options.clone();

    loop {
        let QueryResult { items: page, next_token, .. } = store
            .query_by_index(query.clone().with_options(options.clone()))
            .await?;
        items.extend(page);

        match next_token {
            Some(token) => options.next_token = Some(token),
            None => break,
        }
    }

    Ok(items)
}

pub struct ConflictDetectionService {
    appointments: Arc<dyn DocumentStore<Appointment>>,
}

impl ConflictDetectionService {
    pub fn new(appointments: Arc<dyn DocumentStore<Appointment>>) -> Self {
        Self { appointments }
    }

    /// Active booking holding exactly `candidate` for `doctor_id`, if any.
    pub async fn find_conflict(
        &self,
        doctor_id: &str,
        candidate: &DateTime<FixedOffset>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let date = to_clinic_time(candidate).date_naive();
        debug!("Checking conflicts for doctor {} at {}", doctor_id, candidate);

        let same_day = collect_index(
            self.appointments.as_ref(),
            IndexQuery::new(DOCTOR_DATE_INDEX)
                .key("doctorId", doctor_id)
                .key("appointmentDate", date.format("%Y-%m-%d").to_string())
                .with_options(QueryOptions::default()),
        )
        .await?;

        let conflict = same_day.into_iter().find(|appointment| {
            appointment.appointment_date_time == *candidate
                && appointment.status == AppointmentStatus::Confirmed
                && !appointment.is_deleted()
        });

        if let Some(existing) = &conflict {
            warn!(
                "Conflict detected for doctor {} at {} with appointment {}",
                doctor_id, candidate, existing.id
            );
        }

        Ok(conflict)
    }
}
