use plantcare_core::{ParsedDate, PlantCareState};
use thiserror::Error;

/// A plant is missing a field every plant must carry, or carries a date that
/// cannot be read.  Messages are shown to users verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid plant name.")]
    Name,
    #[error("Invalid watering frequency.")]
    WateringInterval,
    #[error("Invalid last watering date.")]
    LastWaterDate,
    #[error("Invalid last fertilize date.")]
    LastFertilizeDate,
    #[error("Invalid last soil moist date.")]
    LastMoistDate,
}

/// First invalid field, checked in a fixed order.  Dates must be canonical
/// `MM/DD/YYYY` or one of the legacy layouts; the moist date may be empty.
pub fn validate(state: &PlantCareState) -> Result<(), ValidationError> {
    if state.name.is_empty() {
        return Err(ValidationError::Name);
    }
    if state.watering_interval_days == 0 {
        return Err(ValidationError::WateringInterval);
    }
    if !readable(&state.last_water_date) {
        return Err(ValidationError::LastWaterDate);
    }
    if !readable(&state.last_fertilize_date) {
        return Err(ValidationError::LastFertilizeDate);
    }
    if !state.last_moist_date.is_empty() && !readable(&state.last_moist_date) {
        return Err(ValidationError::LastMoistDate);
    }
    Ok(())
}

fn readable(raw: &str) -> bool {
    ParsedDate::parse(raw).date().is_some()
}
