//! Workflows that compose scheduling, the change log and storage.
//!
//! - [`PlantService`]: add / update / delete plants and manage comments.
//! - [`CareSweep`]: one reminder pass over every plant;
//!   [`spawn_sweep_task`] runs it periodically until shutdown.
//! - [`CareMailer`]: where reminders go.
//! - [`Clock`]: injectable time source.

mod clock;
mod error;
mod mailer;
mod service;
mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ServiceError;
pub use mailer::{
    CareMailer, CareReminder, CommandMailer, DebugOnly, LogMailer, MailError, mailer_from_config,
};
pub use service::{PlantDetails, PlantService};
pub use sweep::{CareSweep, SweepReport, spawn_sweep_task};
