use stack_string::{format_sstr, StackString};
use std::{path::Path, sync::Arc};
use time::{macros::format_description, Date, OffsetDateTime, PrimitiveDateTime};

use garmin_lib::{errors::ConverterError as Error, garmin_timezone::GarminTz};

use crate::fitbit_weight::{FitbitWeight, WeightField};

/// A weight entry with its civil timestamp resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMeasurement {
    pub source: Arc<Path>,
    pub datetime: PrimitiveDateTime,
    pub weight: f64,
    pub bmi: Option<f64>,
    pub fat: Option<f64>,
}

impl WeightMeasurement {
    /// # Errors
    /// Return error if date/time don't parse or weight is absent
    pub fn from_fitbit_weight(entry: &FitbitWeight) -> Result<Self, Error> {
        let datetime = match (entry.date.as_deref(), entry.time.as_deref()) {
            (Some(date), Some(time)) => {
                parse_fitbit_datetime(date, time).map_err(|error| Error::TimestampParse {
                    path: entry.source.to_path_buf(),
                    value: format_sstr!("{date} {time}"),
                    error,
                })?
            }
            (date, time) => {
                let missing = if date.is_none() {
                    WeightField::Date
                } else {
                    WeightField::Time
                };
                return Err(Error::TimestampParse {
                    path: entry.source.to_path_buf(),
                    value: format_sstr!("{} {}", date.map_or("", |v| v.as_str()), time.map_or("", |v| v.as_str())),
                    error: format_sstr!("record {} has no {missing}", entry.index),
                });
            }
        };
        let weight = entry.weight.ok_or_else(|| Error::MissingValue {
            path: entry.source.to_path_buf(),
            index: entry.index,
            field: format_sstr!("{}", WeightField::Weight),
        })?;
        Ok(Self {
            source: entry.source.clone(),
            datetime,
            weight,
            bmi: entry.bmi,
            fat: entry.fat,
        })
    }

    /// Calendar day the measurement belongs to.
    #[must_use]
    pub fn day(&self) -> Date {
        self.datetime.date()
    }

    /// The same wall-clock reading, anchored in `tz`.
    #[must_use]
    pub fn with_timezone(&self, tz: GarminTz) -> OffsetDateTime {
        tz.attach(self.datetime)
    }
}

/// Parse a fitbit `MM/DD/YY` date and `HH:MM:SS` time into one timestamp.
///
/// Two digit years follow the `%y` convention: 69-99 are 19xx, 00-68 are
/// 20xx.
///
/// # Errors
/// Return error describing why the strings don't match the expected format
pub fn parse_fitbit_datetime(date: &str, time: &str) -> Result<PrimitiveDateTime, StackString> {
    let (month_day, year) = date
        .rsplit_once('/')
        .ok_or_else(|| StackString::from("date is not MM/DD/YY"))?;
    if year.len() != 2 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err("year is not two digits".into());
    }
    let year: i32 = year.parse().map_err(|e| format_sstr!("{e}"))?;
    let year = if year >= 69 { 1900 + year } else { 2000 + year };
    let full = format_sstr!("{month_day}/{year:04} {time}");
    PrimitiveDateTime::parse(
        &full,
        format_description!("[month]/[day]/[year] [hour]:[minute]:[second]"),
    )
    .map_err(|e| format_sstr!("{e}"))
}

/// # Errors
/// Return error on the first entry that fails to normalize
pub fn normalize_weights(entries: &[FitbitWeight]) -> Result<Vec<WeightMeasurement>, Error> {
    entries
        .iter()
        .map(WeightMeasurement::from_fitbit_weight)
        .collect()
}
