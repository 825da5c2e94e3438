use log::{debug, info};
use std::path::Path;

use garmin_lib::errors::ConverterError as Error;

use crate::{
    daily_weight::FITBIT_DAILY_POLICY,
    fitbit_weight::{load_weight_files, WeightField},
    weight_csv::{daily_rows, measurement_rows, write_weight_csv, GarminWeightRow},
    weight_schema::{validate_fields, ConversionMode},
    weight_timestamp::{normalize_weights, WeightMeasurement},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Full,
    Daily,
}

impl From<OutputMode> for ConversionMode {
    fn from(mode: OutputMode) -> Self {
        match mode {
            OutputMode::Full => Self::Convert,
            OutputMode::Daily => Self::ConvertDaily,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightConversion {
    pub record_count: usize,
    pub rows: Vec<GarminWeightRow>,
}

/// Load, validate and normalize every matching file, then render the rows for
/// `mode`. Nothing is written.
///
/// # Errors
/// Return error if loading, validation or timestamp parsing fails
pub fn convert_weight_files(
    input_dir: &Path,
    glob_pattern: &str,
    mode: OutputMode,
) -> Result<WeightConversion, Error> {
    let dataset = load_weight_files(input_dir, glob_pattern)?;
    validate_fields(&dataset, mode.into())?;
    let fat_recorded = dataset.fields().contains(WeightField::Fat);
    let measurements = normalize_weights(&dataset.entries)?;
    let rows = match mode {
        OutputMode::Full => measurement_rows(&measurements, fat_recorded)?,
        OutputMode::Daily => {
            let daily = FITBIT_DAILY_POLICY.aggregate(&measurements);
            debug!("{} records over {} days", measurements.len(), daily.len());
            daily_rows(&daily, fat_recorded)?
        }
    };
    Ok(WeightConversion {
        record_count: dataset.len(),
        rows,
    })
}

/// # Errors
/// Return error if conversion fails or the output can't be written, in which
/// case no output file is created
pub fn convert_weight_to_csv(
    input_dir: &Path,
    glob_pattern: &str,
    output_file: &Path,
    mode: OutputMode,
) -> Result<WeightConversion, Error> {
    let conversion = convert_weight_files(input_dir, glob_pattern, mode)?;
    write_weight_csv(output_file, &conversion.rows)?;
    info!(
        "wrote {} rows from {} records to {output_file:?}",
        conversion.rows.len(),
        conversion.record_count
    );
    Ok(conversion)
}

/// Per-record timeline for upload, oldest first; `bmi` is not required.
///
/// # Errors
/// Return error if loading, validation or timestamp parsing fails
pub fn load_upload_timeline(
    input_dir: &Path,
    glob_pattern: &str,
) -> Result<Vec<WeightMeasurement>, Error> {
    let dataset = load_weight_files(input_dir, glob_pattern)?;
    validate_fields(&dataset, ConversionMode::Upload)?;
    let mut measurements = normalize_weights(&dataset.entries)?;
    measurements.sort_by_key(|m| m.datetime);
    Ok(measurements)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use tempfile::TempDir;

    use garmin_lib::errors::ConverterError as Error;

    use crate::weight_conversion::{
        convert_weight_files, convert_weight_to_csv, load_upload_timeline, OutputMode,
    };

    #[test]
    fn test_upload_timeline_without_bmi() -> Result<(), Error> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join("weight-1.json"),
            r#"[{"date": "01/02/24", "time": "08:00:00", "weight": 80.1},
                {"date": "01/01/24", "time": "08:00:00", "weight": 80.4}]"#,
        )?;
        let timeline = load_upload_timeline(dir.path(), "weight*.json")?;
        assert_eq!(timeline.len(), 2);
        assert!(timeline[0].datetime < timeline[1].datetime);

        assert!(matches!(
            convert_weight_files(dir.path(), "weight*.json", OutputMode::Full),
            Err(Error::MissingFields(_))
        ));
        Ok(())
    }

    #[test]
    fn test_failed_conversion_writes_nothing() -> Result<(), Error> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join("weight-1.json"),
            r#"[{"date": "01/01/24", "time": "08:00:00", "weight": 80.4, "bmi": 24.0},
                {"date": "2024-01-02", "time": "08:00:00", "weight": 80.1, "bmi": 23.9}]"#,
        )?;
        let output = dir.path().join("out.csv");
        assert!(matches!(
            convert_weight_to_csv(dir.path(), "weight*.json", &output, OutputMode::Daily),
            Err(Error::TimestampParse { .. })
        ));
        assert!(!output.exists());
        Ok(())
    }
}
