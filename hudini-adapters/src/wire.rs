//! Serde helpers for vendor payloads.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer};

/// `null` and missing both become `T::default()`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps that are absent, null, or the year-1 zero value some vendors
/// send for "unset".
pub fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };

    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Plain dates, e.g. "2024-03-15"
            chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
        })
        .map_err(serde::de::Error::custom)?;

    Ok(Some(parsed).filter(|dt| dt.year() > 1))
}
