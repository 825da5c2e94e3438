use log::debug;
use stack_string::format_sstr;

use garmin_lib::errors::ConverterError as Error;

use crate::fitbit_weight::{FieldSet, WeightDataset, WeightField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionMode {
    Convert,
    ConvertDaily,
    Upload,
}

impl ConversionMode {
    #[must_use]
    pub fn required_fields(self) -> &'static [WeightField] {
        match self {
            Self::Convert | Self::ConvertDaily => &[
                WeightField::Date,
                WeightField::Time,
                WeightField::Weight,
                WeightField::Bmi,
            ],
            Self::Upload => &[WeightField::Date, WeightField::Time, WeightField::Weight],
        }
    }
}

/// Every required field must be declared by at least one record, a field no
/// record declares is treated as a missing column.
///
/// # Errors
/// Return error listing all missing fields
pub fn validate_fields(dataset: &WeightDataset, mode: ConversionMode) -> Result<(), Error> {
    check_fields(dataset.fields(), mode)
}

/// # Errors
/// Return error listing all missing fields
pub fn check_fields(present: FieldSet, mode: ConversionMode) -> Result<(), Error> {
    let missing: Vec<_> = mode
        .required_fields()
        .iter()
        .filter(|f| !present.contains(**f))
        .map(|f| format_sstr!("{f}"))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        debug!("{mode:?} missing {missing:?}");
        Err(Error::MissingFields(missing))
    }
}
