// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, FixedOffset};
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// What a cancel request should do given the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancel,
    AlreadyCancelled,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Confirmed => vec![AppointmentStatus::Cancelled, AppointmentStatus::NoShow],
            // Terminal states
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::NoShow => vec![],
        }
    }

    /// Repeated cancels succeed without touching the record.
    pub fn cancel_outcome(&self, current_status: AppointmentStatus) -> Result<CancelOutcome, AppointmentError> {
        if current_status == AppointmentStatus::Cancelled {
            return Ok(CancelOutcome::AlreadyCancelled);
        }

        self.validate_status_transition(current_status, AppointmentStatus::Cancelled)?;
        Ok(CancelOutcome::Cancel)
    }

    /// Confirmed and strictly before `now`.
    pub fn should_mark_no_show(
        &self,
        current_status: AppointmentStatus,
        scheduled_at: &DateTime<FixedOffset>,
        now: &DateTime<FixedOffset>,
    ) -> bool {
        current_status == AppointmentStatus::Confirmed && scheduled_at < now
    }
}
