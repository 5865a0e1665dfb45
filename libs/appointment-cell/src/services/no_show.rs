// libs/appointment-cell/src/services/no_show.rs
use std::sync::Arc;

use tracing::{info, warn};

use crate::models::{AppointmentError, CronEvent, CronResult};
use crate::services::booking::AppointmentService;

pub const NO_SHOW_DETECTION: &str = "NO_SHOW_DETECTION";

/// Routes externally scheduled cron events to the sweep.
pub struct NoShowSweeper {
    appointments: Arc<AppointmentService>,
}

impl NoShowSweeper {
    pub fn new(appointments: Arc<AppointmentService>) -> Self {
        Self { appointments }
    }

    pub async fn handle_event(&self, event: &CronEvent) -> Result<CronResult, AppointmentError> {
        match event.job_name() {
            Some(NO_SHOW_DETECTION) => {
                info!("Starting no-show detection");
                let count = self.appointments.mark_no_shows().await?;

                Ok(CronResult {
                    success: true,
                    count: Some(count),
                    message: format!("Marked {} appointments as no-show", count),
                })
            }
            other => {
                warn!("Unknown cron job: {:?}", other);
                Ok(CronResult {
                    success: false,
                    count: None,
                    message: "Unknown cron job".to_string(),
                })
            }
        }
    }
}
