//! Validation of raw 311 records.
//!
//! Socrata serializes numeric columns as strings and omits columns that are
//! null, so every field starts out optional here. A record becomes a
//! [`NoiseComplaint`] only once it has a `unique_key` and any coordinates it
//! carries parse as numbers.

use quiet_spaces_complaint_models::NoiseComplaint;
use serde::Deserialize;

/// Why a raw record was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The record is not an object of the expected shape.
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// `unique_key` is absent or blank.
    #[error("record has no unique_key")]
    MissingId,

    /// A coordinate column is present but not a number.
    #[error("record {id}: invalid {field} value {value}")]
    InvalidCoordinate {
        /// Record key.
        id: String,
        /// Column name.
        field: &'static str,
        /// The offending raw value.
        value: serde_json::Value,
    },
}

/// The subset of 311 columns this service keeps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawComplaintRecord {
    /// Upstream unique key.
    #[serde(default)]
    pub unique_key: Option<String>,
    /// Latitude, usually a decimal string.
    #[serde(default)]
    pub latitude: Option<serde_json::Value>,
    /// Longitude, usually a decimal string.
    #[serde(default)]
    pub longitude: Option<serde_json::Value>,
    /// Complaint type label.
    #[serde(default)]
    pub complaint_type: Option<String>,
}

impl RawComplaintRecord {
    /// Validates the record.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the key is missing or a coordinate is
    /// not numeric.
    pub fn into_complaint(self) -> Result<NoiseComplaint, ValidationError> {
        let id = self
            .unique_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ValidationError::MissingId)?;

        let latitude = parse_coordinate(&id, "latitude", self.latitude)?;
        let longitude = parse_coordinate(&id, "longitude", self.longitude)?;

        Ok(NoiseComplaint {
            id,
            latitude,
            longitude,
            category: self.complaint_type.filter(|t| !t.trim().is_empty()),
        })
    }
}

/// Validates one raw JSON value.
///
/// # Errors
///
/// Returns [`ValidationError`] if the value is not a valid record.
pub fn parse_record(value: serde_json::Value) -> Result<NoiseComplaint, ValidationError> {
    serde_json::from_value::<RawComplaintRecord>(value)?.into_complaint()
}

/// Validates a page of raw records, logging and skipping invalid ones.
#[must_use]
pub fn parse_records(values: Vec<serde_json::Value>) -> Vec<NoiseComplaint> {
    let total = values.len();
    let complaints: Vec<NoiseComplaint> = values
        .into_iter()
        .filter_map(|value| {
            parse_record(value)
                .inspect_err(|e| log::warn!("Failed to parse complaint record: {e}"))
                .ok()
        })
        .collect();

    let skipped = total - complaints.len();
    if skipped > 0 {
        log::warn!("Skipped {skipped}/{total} invalid complaint records");
    }

    complaints
}

fn parse_coordinate(
    id: &str,
    field: &'static str,
    raw: Option<serde_json::Value>,
) -> Result<Option<f64>, ValidationError> {
    let invalid = |value: serde_json::Value| ValidationError::InvalidCoordinate {
        id: id.to_string(),
        field,
        value,
    };

    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(serde_json::Value::Number(n))),
        Some(serde_json::Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| invalid(serde_json::Value::String(s)))
        }
        Some(other) => Err(invalid(other)),
    }
}
