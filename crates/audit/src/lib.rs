//! Change-tracked audit log for plants.
//!
//! [`diff`] compares two care states field by field in a fixed order and
//! renders one line per change; [`ChangeLog`] persists those lines with a
//! per-plant ceiling and composes validation, diffing and notify-date
//! resets into [`ChangeLog::apply_update`].

mod changelog;
mod diff;
mod validate;

pub use changelog::{ChangeLog, DEFAULT_MAX_ENTRIES, merge_care};
pub use diff::{LogMessage, diff};
pub use validate::{ValidationError, validate};

use plantcare_store::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to write plant log: {0}")]
    Persistence(#[from] PersistenceError),
}
