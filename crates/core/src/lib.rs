//! Domain records shared by every plantcare crate.
//!
//! | Record            | Owned by | Notes                                         |
//! |-------------------|----------|-----------------------------------------------|
//! | [`Plant`]         | owner    | carries the mutable [`PlantCareState`]        |
//! | [`PlantLogEntry`] | plant    | audit trail, bounded per plant                |
//! | [`Comment`]       | plant    | visitor comments, bounded globally            |
//!
//! Dates on plant records are stored as text; [`ParsedDate`] classifies them
//! once at the boundary so callers never re-parse ambiguous strings.

pub mod comment;
pub mod date;
pub mod log;
pub mod plant;

pub use comment::Comment;
pub use date::{
    CANONICAL_FORMAT, DateParseError, LegacyFormat, ParsedDate, REFERENCE_TZ, civil_date,
    format_canonical, start_of_day,
};
pub use log::PlantLogEntry;
pub use plant::{Owner, Plant, PlantCareState, RecordId};
