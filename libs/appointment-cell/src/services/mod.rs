pub mod booking;
pub mod conflict;
pub mod enrichment;
pub mod lifecycle;
pub mod no_show;
pub mod slot_clock;
pub mod slot_lock;

pub use booking::{AppointmentService, TableHealth};
pub use conflict::ConflictDetectionService;
pub use enrichment::EnrichmentService;
pub use lifecycle::{AppointmentLifecycleService, CancelOutcome};
pub use no_show::{NoShowSweeper, NO_SHOW_DETECTION};
pub use slot_clock::{Clock, FixedClock, SystemClock};
pub use slot_lock::SlotLockRegistry;
