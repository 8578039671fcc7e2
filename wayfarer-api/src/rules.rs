//! Field checks shared by request bodies that `validator` attributes cannot express.

use std::borrow::Cow;

use rust_decimal::Decimal;
use validator::ValidationError;
use wayfarer_catalog::pricing::validate_seasons;
use wayfarer_core::FieldError;
use wayfarer_shared::{DateWindow, GeoPoint, SeasonalRate};

use crate::error::AppError;

/// `validator` custom rule for money amounts.
pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("range").with_message(Cow::Borrowed("must not be negative")));
    }
    Ok(())
}

/// Accumulates errors from several checks and reports them together.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, path: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError::field(path, message));
        self
    }

    pub fn location(&mut self, path: &str, point: Option<&GeoPoint>) -> &mut Self {
        if let Some(point) = point {
            if !(-180.0..=180.0).contains(&point.lng()) || !(-90.0..=90.0).contains(&point.lat()) {
                self.fail(
                    format!("{}.coordinates", path),
                    "coordinates must be [longitude, latitude] within range",
                );
            }
        }
        self
    }

    pub fn windows(&mut self, path: &str, windows: &[DateWindow]) -> &mut Self {
        for (i, window) in windows.iter().enumerate() {
            if !window.is_well_formed() {
                self.fail(format!("{}.{}.end", path, i), "end must be after start");
            }
        }
        self
    }

    pub fn seasons(&mut self, path: &str, seasons: &[SeasonalRate]) -> &mut Self {
        if let Err(e) = validate_seasons(seasons) {
            self.fail(path, e.to_string());
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(AppError::ValidationError(std::mem::take(&mut self.errors)))
    }
}
