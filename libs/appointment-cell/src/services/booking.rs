// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use shared_database::{DocumentStore, Filter, IndexQuery, QueryOptions};
use shared_models::{Doctor, Patient, Record};
use shared_utils::{mask_phone, Encryptor};

use crate::models::{
    Appointment, AppointmentError, AppointmentQuery, AppointmentStatus, AppointmentView,
    CreateAppointmentRequest, SearchAppointmentsRequest, UpdateAppointmentRequest,
};
use crate::services::conflict::{
    collect_index, ConflictDetectionService, DATE_INDEX, DOCTOR_DATE_INDEX, PATIENT_DATE_INDEX,
};
use crate::services::enrichment::EnrichmentService;
use crate::services::lifecycle::{AppointmentLifecycleService, CancelOutcome};
use crate::services::slot_clock::{
    compose_instant, format_instant, parse_date, validate_slot_time, Clock,
};
use crate::services::slot_lock::SlotLockRegistry;

pub const DEFAULT_SEARCH_SCAN_LIMIT: usize = 1000;
pub const DEFAULT_NO_SHOW_SCAN_LIMIT: usize = 1000;

/// Reachability of one backing table.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TableHealth {
    pub table: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The scheduling core: booking, lookups, cancellation, rescheduling and the
/// no-show sweep over the appointment table.
pub struct AppointmentService {
    appointments: Arc<dyn DocumentStore<Appointment>>,
    doctors: Arc<dyn DocumentStore<Doctor>>,
    patients: Arc<dyn DocumentStore<Patient>>,
    conflicts: ConflictDetectionService,
    enrichment: EnrichmentService,
    lifecycle: AppointmentLifecycleService,
    encryptor: Arc<dyn Encryptor>,
    clock: Arc<dyn Clock>,
    slot_locks: SlotLockRegistry,
    search_scan_limit: usize,
    no_show_scan_limit: usize,
}

impl AppointmentService {
    pub fn new(
        appointments: Arc<dyn DocumentStore<Appointment>>,
        doctors: Arc<dyn DocumentStore<Doctor>>,
        patients: Arc<dyn DocumentStore<Patient>>,
        encryptor: Arc<dyn Encryptor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            conflicts: ConflictDetectionService::new(appointments.clone()),
            enrichment: EnrichmentService::new(doctors.clone(), patients.clone()),
            lifecycle: AppointmentLifecycleService::new(),
            slot_locks: SlotLockRegistry::new(),
            search_scan_limit: DEFAULT_SEARCH_SCAN_LIMIT,
            no_show_scan_limit: DEFAULT_NO_SHOW_SCAN_LIMIT,
            appointments,
            doctors,
            patients,
            encryptor,
            clock,
        }
    }

    pub fn with_scan_limits(mut self, search_scan_limit: usize, no_show_scan_limit: usize) -> Self {
        self.search_scan_limit = search_scan_limit;
        self.no_show_scan_limit = no_show_scan_limit;
        self
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id))]
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        if request.booker_name.trim().is_empty() || request.booker_phone.trim().is_empty() {
            return Err(AppointmentError::InvalidInput(
                "Booker name and phone are required".to_string(),
            ));
        }
        let doctor_id = required(&request.doctor_id, "doctorId")?;

        if !validate_slot_time(&request.appointment_time) {
            return Err(AppointmentError::InvalidTime(
                "Time must be in HH:00 or HH:30 format".to_string(),
            ));
        }

        let date = parse_date(&request.appointment_date)?;
        let instant = compose_instant(date, &request.appointment_time)?;
        if self.clock.is_past(&instant) {
            return Err(AppointmentError::PastTime);
        }

        let _slot = self.slot_locks.acquire(doctor_id, &instant).await;

        if self.conflicts.find_conflict(doctor_id, &instant).await?.is_some() {
            return Err(AppointmentError::Duplicated);
        }

        let encrypted_phone = self.encryptor.encrypt(&request.booker_phone)?;

        let mut fields = Map::new();
        fields.insert("doctorId".to_string(), json!(doctor_id));
        if let Some(patient_id) = non_empty(request.patient_id.as_deref()) {
            fields.insert("patientId".to_string(), json!(patient_id));
        }
        fields.insert("bookerName".to_string(), json!(request.booker_name));
        fields.insert("bookerPhone".to_string(), json!(encrypted_phone));
        fields.insert("appointmentDate".to_string(), json!(date_key(date)));
        fields.insert("appointmentTime".to_string(), json!(request.appointment_time));
        fields.insert("appointmentDateTime".to_string(), json!(format_instant(&instant)));
        fields.insert("status".to_string(), json!(AppointmentStatus::Confirmed));
        if let Some(notes) = request.notes {
            fields.insert("notes".to_string(), json!(notes));
        }

        let mut appointment = self.appointments.create(Value::Object(fields)).await?;
        appointment.booker_phone = request.booker_phone;

        info!(
            "Created appointment {} for doctor {} at {} (booker phone {})",
            appointment.id,
            appointment.doctor_id,
            format_instant(&appointment.appointment_date_time),
            mask_phone(&appointment.booker_phone)
        );
        Ok(appointment)
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    #[instrument(skip(self))]
    pub async fn query_appointments(
        &self,
        query: AppointmentQuery,
    ) -> Result<Vec<AppointmentView>, AppointmentError> {
        let date = match non_empty(query.appointment_date.as_deref()) {
            Some(date) => date_key(parse_date(date)?),
            None => {
                return Err(AppointmentError::InvalidInput(
                    "appointmentDate is required".to_string(),
                ))
            }
        };
        let doctor_id = non_empty(query.doctor_id.as_deref());
        let patient_id = non_empty(query.patient_id.as_deref());

        let index_query = match (doctor_id, patient_id) {
            (Some(doctor_id), _) => IndexQuery::new(DOCTOR_DATE_INDEX)
                .key("doctorId", doctor_id)
                .key("appointmentDate", date),
            (None, Some(patient_id)) => IndexQuery::new(PATIENT_DATE_INDEX)
                .key("patientId", patient_id)
                .key("appointmentDate", date),
            (None, None) => IndexQuery::new(DATE_INDEX).key("appointmentDate", date),
        };

        let appointments = collect_index(self.appointments.as_ref(), index_query)
            .await?
            .into_iter()
            .filter(|appointment| !appointment.is_deleted())
            // doctor+patient: the doctor index narrows, the patient is matched here
            .filter(|appointment| {
                doctor_id.is_none()
                    || patient_id.map_or(true, |id| appointment.patient_id.as_deref() == Some(id))
            })
            .filter(|appointment| {
                query.include_all || appointment.status == AppointmentStatus::Confirmed
            })
            .collect::<Vec<_>>();

        debug!("Query matched {} appointments", appointments.len());
        Ok(self.views_of(appointments).await)
    }

    /// Name is a substring match; phone is compared after decrypting each
    /// candidate.
    #[instrument(skip(self, request))]
    pub async fn search_appointments(
        &self,
        request: SearchAppointmentsRequest,
    ) -> Result<Vec<AppointmentView>, AppointmentError> {
        let candidates = match non_empty(request.appointment_date.as_deref()) {
            Some(date) => {
                let date = date_key(parse_date(date)?);
                collect_index(
                    self.appointments.as_ref(),
                    IndexQuery::new(DATE_INDEX).key("appointmentDate", date),
                )
                .await?
            }
            None => {
                let result = self
                    .appointments
                    .scan(None, QueryOptions::limit(self.search_scan_limit))
                    .await?;
                if result.next_token.is_some() {
                    warn!(
                        "Undated search stopped at {} appointments; narrow it with appointmentDate",
                        self.search_scan_limit
                    );
                }
                result.items
            }
        };

        let booker_name = non_empty(request.booker_name.as_deref());
        let booker_phone = non_empty(request.booker_phone.as_deref());

        let matches = candidates
            .into_iter()
            .filter(|appointment| !appointment.is_deleted())
            .filter(|appointment| booker_name.map_or(true, |name| appointment.booker_name.contains(name)))
            .map(|appointment| self.reveal_phone(appointment))
            .filter(|appointment| booker_phone.map_or(true, |phone| appointment.booker_phone == phone))
            .collect::<Vec<_>>();

        debug!("Search matched {} appointments", matches.len());
        Ok(self.enrichment.populate(matches).await)
    }

    #[instrument(skip(self))]
    pub async fn get_appointment(&self, id: &str) -> Result<AppointmentView, AppointmentError> {
        let appointment = self.find_active(id).await?;
        let mut views = self.views_of(vec![appointment]).await;
        views.pop().ok_or(AppointmentError::NotFound)
    }

    // ==========================================================================
    // MUTATIONS
    // ==========================================================================

    /// Repeating a cancel succeeds and keeps the first reason and timestamp.
    #[instrument(skip(self, reason))]
    pub async fn cancel_appointment(
        &self,
        id: &str,
        reason: Option<String>,
    ) -> Result<bool, AppointmentError> {
        let appointment = self.find_active(id).await?;

        if self.lifecycle.cancel_outcome(appointment.status)? == CancelOutcome::AlreadyCancelled {
            debug!("Appointment {} already cancelled", id);
            return Ok(true);
        }

        let now = self.clock.now();
        self.appointments
            .update(
                id,
                json!({
                    "status": AppointmentStatus::Cancelled,
                    "cancelReason": reason,
                    "cancelledAt": format_instant(&now),
                }),
            )
            .await?;

        info!("Cancelled appointment {}", id);
        Ok(true)
    }

    #[instrument(skip(self, request))]
    pub async fn update_appointment(
        &self,
        id: &str,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let existing = self.find_active(id).await?;
        let mut patch = Map::new();

        if let Some(name) = &request.booker_name {
            required(name, "bookerName")?;
            patch.insert("bookerName".to_string(), json!(name));
        }
        if let Some(phone) = &request.booker_phone {
            required(phone, "bookerPhone")?;
            patch.insert("bookerPhone".to_string(), json!(self.encryptor.encrypt(phone)?));
        }
        if let Some(patient_id) = &request.patient_id {
            // an empty id detaches the patient
            let value = non_empty(Some(patient_id.as_str())).map_or(Value::Null, |id| json!(id));
            patch.insert("patientId".to_string(), value);
        }
        if let Some(notes) = &request.notes {
            patch.insert("notes".to_string(), json!(notes));
        }

        let mut _slot = None;
        if request.reschedules() {
            let date = match non_empty(request.appointment_date.as_deref()) {
                Some(date) => parse_date(date)?,
                None if request.appointment_date.is_some() => {
                    return Err(AppointmentError::InvalidInput(
                        "appointmentDate must not be empty".to_string(),
                    ))
                }
                None => existing.appointment_date,
            };
            let time = request
                .appointment_time
                .clone()
                .unwrap_or_else(|| existing.appointment_time.clone());

            if !validate_slot_time(&time) {
                return Err(AppointmentError::InvalidTime(
                    "Time must be in HH:00 or HH:30 format".to_string(),
                ));
            }

            let instant = compose_instant(date, &time)?;
            if self.clock.is_past(&instant) {
                return Err(AppointmentError::PastTime);
            }

            if instant != existing.appointment_date_time {
                _slot = Some(self.slot_locks.acquire(&existing.doctor_id, &instant).await);

                let conflict = self.conflicts.find_conflict(&existing.doctor_id, &instant).await?;
                if conflict.is_some_and(|other| other.id != existing.id) {
                    return Err(AppointmentError::Duplicated);
                }
            }

            patch.insert("appointmentDate".to_string(), json!(date_key(date)));
            patch.insert("appointmentTime".to_string(), json!(time));
            patch.insert("appointmentDateTime".to_string(), json!(format_instant(&instant)));
        }

        let updated = self.appointments.update(id, Value::Object(patch)).await?;
        let updated = match request.booker_phone {
            Some(phone) => Appointment {
                booker_phone: phone,
                ..updated
            },
            None => self.reveal_phone(updated),
        };

        info!("Updated appointment {}", id);
        Ok(updated)
    }

    // ==========================================================================
    // NO-SHOW SWEEP
    // ==========================================================================

    /// Marks every elapsed confirmed appointment as no-show and returns how
    /// many were marked. Stops at the first failed write.
    #[instrument(skip(self))]
    pub async fn mark_no_shows(&self) -> Result<usize, AppointmentError> {
        let now = self.clock.now();
        let now_key = format_instant(&now);

        let filter = Filter::and([
            Filter::eq("status", AppointmentStatus::Confirmed.as_str()),
            Filter::lt("appointmentDateTime", now_key.clone()),
            Filter::not_exists("deletedAt"),
        ]);

        let candidates = self
            .appointments
            .scan(Some(filter), QueryOptions::limit(self.no_show_scan_limit))
            .await?;
        if candidates.next_token.is_some() {
            warn!(
                "No-show sweep capped at {} candidates; the rest wait for the next run",
                self.no_show_scan_limit
            );
        }

        let mut marked = 0;
        for appointment in candidates.items {
            if appointment.is_deleted()
                || !self.lifecycle.should_mark_no_show(
                    appointment.status,
                    &appointment.appointment_date_time,
                    &now,
                )
            {
                continue;
            }

            self.appointments
                .update(
                    &appointment.id,
                    json!({
                        "status": AppointmentStatus::NoShow,
                        "noShowAt": now_key,
                    }),
                )
                .await?;
            debug!("Marked appointment {} as no-show", appointment.id);
            marked += 1;
        }

        info!("Marked {} appointments as no-show", marked);
        Ok(marked)
    }

    // ==========================================================================
    // HEALTH
    // ==========================================================================

    pub async fn check_tables(&self) -> Vec<TableHealth> {
        let (doctors, patients, appointments) = futures::join!(
            self.doctors.check_table(),
            self.patients.check_table(),
            self.appointments.check_table(),
        );

        [
            (self.doctors.table_name(), doctors),
            (self.patients.table_name(), patients),
            (self.appointments.table_name(), appointments),
        ]
        .into_iter()
        .map(|(table, result)| match result {
            Ok(reachable) => TableHealth {
                table: table.to_string(),
                reachable,
                error: None,
            },
            Err(e) => TableHealth {
                table: table.to_string(),
                reachable: false,
                error: Some(e.to_string()),
            },
        })
        .collect()
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    async fn find_active(&self, id: &str) -> Result<Appointment, AppointmentError> {
        match self.appointments.get_by_id(id).await? {
            Some(appointment) if !appointment.is_deleted() => Ok(appointment),
            _ => Err(AppointmentError::NotFound),
        }
    }

    /// Replaces the stored ciphertext with plaintext; undecryptable values
    /// read as empty.
    fn reveal_phone(&self, mut appointment: Appointment) -> Appointment {
        appointment.booker_phone = match self.encryptor.decrypt(&appointment.booker_phone) {
            Ok(phone) => phone,
            Err(e) => {
                warn!("Could not decrypt booker phone of appointment {}: {}", appointment.id, e);
                String::new()
            }
        };
        appointment
    }

    async fn views_of(&self, appointments: Vec<Appointment>) -> Vec<AppointmentView> {
        let revealed = appointments
            .into_iter()
            .map(|appointment| self.reveal_phone(appointment))
            .collect();
        self.enrichment.populate(revealed).await
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, AppointmentError> {
    non_empty(Some(value))
        .ok_or_else(|| AppointmentError::InvalidInput(format!("{} is required", field)))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
