use serde::{Serialize, Serializer};
use stack_string::StackString;
use std::{fs, path::Path};
use time::macros::format_description;

use garmin_lib::errors::ConverterError as Error;

use crate::{daily_weight::DailyWeight, weight_timestamp::WeightMeasurement};

pub const CSV_HEADER: &str = "Date,Weight,BMI,Fat";

/// Value of the `Fat` column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FatCell {
    /// No input record carried `fat`, the column defaults to `0`.
    NotRecorded,
    Missing,
    Value(f64),
}

impl FatCell {
    #[must_use]
    pub fn new(fat: Option<f64>, fat_recorded: bool) -> Self {
        match fat {
            _ if !fat_recorded => Self::NotRecorded,
            Some(fat) => Self::Value(fat),
            None => Self::Missing,
        }
    }
}

impl Serialize for FatCell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::NotRecorded => serializer.serialize_u8(0),
            Self::Missing => serializer.serialize_none(),
            Self::Value(fat) => serializer.serialize_f64(*fat),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GarminWeightRow {
    #[serde(rename = "Date")]
    pub date: StackString,
    #[serde(rename = "Weight")]
    pub weight: f64,
    #[serde(rename = "BMI")]
    pub bmi: Option<f64>,
    #[serde(rename = "Fat")]
    pub fat: FatCell,
}

/// One row per measurement, oldest first. Measurements sharing a timestamp
/// keep their input order.
///
/// # Errors
/// Return error if formatting a timestamp fails
pub fn measurement_rows(
    measurements: &[WeightMeasurement],
    fat_recorded: bool,
) -> Result<Vec<GarminWeightRow>, Error> {
    let mut measurements: Vec<_> = measurements.iter().collect();
    measurements.sort_by_key(|m| m.datetime);
    measurements
        .into_iter()
        .map(|m| -> Result<GarminWeightRow, Error> {
            let date = m
                .datetime
                .format(format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second]"
                ))?
                .into();
            Ok(GarminWeightRow {
                date,
                weight: m.weight,
                bmi: m.bmi,
                fat: FatCell::new(m.fat, fat_recorded),
            })
        })
        .collect()
}

/// One row per day, oldest first.
///
/// # Errors
/// Return error if formatting a date fails
pub fn daily_rows(daily: &[DailyWeight], fat_recorded: bool) -> Result<Vec<GarminWeightRow>, Error> {
    let mut daily = daily.to_vec();
    daily.sort_by_key(|d| d.day);
    daily
        .into_iter()
        .map(|d| -> Result<GarminWeightRow, Error> {
            let date = d.day.format(format_description!("[year]-[month]-[day]"))?.into();
            Ok(GarminWeightRow {
                date,
                weight: d.weight,
                bmi: d.bmi,
                fat: FatCell::new(d.fat, fat_recorded),
            })
        })
        .collect()
}

/// # Errors
/// Return error if serialization fails
pub fn rows_to_csv(rows: &[GarminWeightRow]) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(CSV_HEADER.split(','))?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::IoError(e.into_error()))
}

/// Render the whole document first, then write it out in a single call.
///
/// # Errors
/// Return error if serialization or the write fails
pub fn write_weight_csv(output_file: &Path, rows: &[GarminWeightRow]) -> Result<(), Error> {
    let buf = rows_to_csv(rows)?;
    fs::write(output_file, buf)?;
    Ok(())
}
