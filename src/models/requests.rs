//! Request DTOs for the tracker API
//!
//! Defines the structure of incoming HTTP request bodies and the
//! field-level validation applied before anything is persisted.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use axum::body::Bytes;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::FieldErrors;
use crate::models::tree::{TreeFields, LATITUDE_RANGE, LONGITUDE_RANGE};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const LATITUDE_OUT_OF_RANGE: &str = "Latitude must be between -90 and 90.";
pub const LONGITUDE_OUT_OF_RANGE: &str = "Longitude must be between -180 and 180.";
pub const INVALID_NUMBER: &str = "A valid number is required.";
pub const BAD_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

/// Maximum stored length of a species name.
pub const MAX_SPECIES_LENGTH: usize = 100;

/// How a tree payload is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// POST: every required field must be present
    Create,
    /// PUT: every required field must be present, photo is kept when omitted
    Replace,
    /// PATCH: omitted fields keep their current value
    Patch,
}

// == Tree Entry Request ==
/// Body of POST/PUT/PATCH on `/trees/`.
///
/// Every field is optional at the wire level so that missing fields can be
/// reported together, keyed by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreeEntryRequest {
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub latitude: Option<NumberInput>,
    #[serde(default)]
    pub longitude: Option<NumberInput>,
    #[serde(default)]
    pub date_planted: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

impl TreeEntryRequest {
    /// Validates the payload and merges it over `current` according to `mode`.
    ///
    /// All problems are collected before returning, so one response names
    /// every offending field.
    pub fn validate(
        &self,
        current: Option<&TreeFields>,
        mode: WriteMode,
    ) -> Result<TreeFields, FieldErrors> {
        let mut errors = FieldErrors::new();
        let fallback = match mode {
            WriteMode::Patch => current,
            WriteMode::Create | WriteMode::Replace => None,
        };

        let species = match (&self.species, fallback) {
            (Some(species), _) => {
                let trimmed = species.trim();
                if trimmed.is_empty() {
                    errors.add("species", BLANK);
                } else if trimmed.chars().count() > MAX_SPECIES_LENGTH {
                    errors.add(
                        "species",
                        format!(
                            "Ensure this field has no more than {} characters.",
                            MAX_SPECIES_LENGTH
                        ),
                    );
                }
                Some(trimmed.to_string())
            }
            (None, Some(base)) => Some(base.species.clone()),
            (None, None) => {
                errors.add("species", REQUIRED);
                None
            }
        };

        let latitude = coordinate(
            &mut errors,
            "latitude",
            self.latitude.as_ref(),
            fallback.map(|b| b.latitude),
            LATITUDE_RANGE,
            LATITUDE_OUT_OF_RANGE,
        );
        let longitude = coordinate(
            &mut errors,
            "longitude",
            self.longitude.as_ref(),
            fallback.map(|b| b.longitude),
            LONGITUDE_RANGE,
            LONGITUDE_OUT_OF_RANGE,
        );

        let date_planted = match (&self.date_planted, fallback) {
            (Some(raw), _) => match parse_date(raw) {
                Some(date) => Some(date),
                None => {
                    errors.add("date_planted", BAD_DATE);
                    None
                }
            },
            (None, Some(base)) => Some(base.date_planted),
            (None, None) => {
                errors.add("date_planted", REQUIRED);
                None
            }
        };

        let photo = match &self.photo {
            Some(photo) if photo.trim().is_empty() => None,
            Some(photo) => Some(photo.clone()),
            None => current.and_then(|c| c.photo.clone()),
        };

        match (species, latitude, longitude, date_planted) {
            (Some(species), Some(latitude), Some(longitude), Some(date_planted))
                if errors.is_empty() =>
            {
                Ok(TreeFields {
                    species,
                    latitude,
                    longitude,
                    date_planted,
                    photo,
                })
            }
            _ => Err(errors),
        }
    }

    /// Builds a request from form fields, where every value arrives as text.
    pub fn from_form(fields: &HashMap<String, String>) -> Self {
        Self {
            species: fields.get("species").cloned(),
            latitude: fields.get("latitude").cloned().map(NumberInput::Text),
            longitude: fields.get("longitude").cloned().map(NumberInput::Text),
            date_planted: fields.get("date_planted").cloned(),
            photo: fields.get("photo").cloned(),
        }
    }
}

/// A numeric field as sent by the client.
///
/// JSON bodies may carry a number or a numeric string; form bodies only
/// carry text. Anything else is kept so it can be reported under the field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl NumberInput {
    fn is_blank(&self) -> bool {
        matches!(self, NumberInput::Text(text) if text.trim().is_empty())
    }

    /// The finite value carried, if any.
    pub fn value(&self) -> Option<f64> {
        match self {
            NumberInput::Number(n) => Some(*n),
            NumberInput::Text(text) => text.trim().parse::<f64>().ok(),
            NumberInput::Other(_) => None,
        }
        .filter(|n| n.is_finite())
    }
}

impl From<f64> for NumberInput {
    fn from(n: f64) -> Self {
        NumberInput::Number(n)
    }
}

fn coordinate(
    errors: &mut FieldErrors,
    field: &str,
    input: Option<&NumberInput>,
    fallback: Option<f64>,
    range: RangeInclusive<f64>,
    out_of_range: &str,
) -> Option<f64> {
    let value = match input {
        Some(input) if input.is_blank() => {
            errors.add(field, REQUIRED);
            return None;
        }
        Some(input) => match input.value() {
            Some(value) => value,
            None => {
                errors.add(field, INVALID_NUMBER);
                return None;
            }
        },
        None => match fallback {
            Some(value) => value,
            None => {
                errors.add(field, REQUIRED);
                return None;
            }
        },
    };
    if !range.contains(&value) {
        errors.add(field, out_of_range);
    }
    Some(value)
}

/// A file sent in the `photo` part of a multipart tree body.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Parses an ISO `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

// == Account Requests ==
/// Body of POST `/register/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

/// Body of POST `/login/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Body of POST `/token/refresh/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Returns the trimmed value or records a required/blank error.
pub fn required_text(errors: &mut FieldErrors, field: &str, value: &Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        Some(_) => {
            errors.add(field, BLANK);
            String::new()
        }
        None => {
            errors.add(field, REQUIRED);
            String::new()
        }
    }
}
