use chrono::Datelike;

pub const MIN_YEAR: i32 = 1900;
pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 10.0;

/// Director used when the lookup service does not know one.
pub const UNKNOWN_DIRECTOR: &str = "Unknown";

/// OMDb uses this placeholder for every field it has no value for.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid year format.")]
    YearFormat(String),
    #[error("Invalid year {year}. Year must be between 1900 and {max}.")]
    YearRange { year: i32, max: i32 },
    #[error("Invalid rating format.")]
    RatingFormat(String),
    #[error("Invalid rating {0}. Rating must be between 1 and 10.")]
    RatingRange(f64),
}

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Parse a release year and check it lies in `[1900, current_year]`.
pub fn parse_year(raw: &str, current_year: i32) -> Result<i32, ValidationError> {
    let year: i32 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::YearFormat(raw.to_string()))?;
    if !(MIN_YEAR..=current_year).contains(&year) {
        return Err(ValidationError::YearRange { year, max: current_year });
    }
    Ok(year)
}

/// Parse a rating and check it lies in `[1, 10]`.
pub fn parse_rating(raw: &str) -> Result<f64, ValidationError> {
    let rating: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::RatingFormat(raw.to_string()))?;
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ValidationError::RatingRange(rating));
    }
    Ok(rating)
}

/// Map a missing, blank or "N/A" director to [`UNKNOWN_DIRECTOR`].
pub fn director_or_unknown(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(d) if !d.is_empty() && d != NOT_AVAILABLE => d.to_string(),
        _ => UNKNOWN_DIRECTOR.to_string(),
    }
}
