use derive_more::Display;
use glob::{glob, Pattern};
use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};
use stack_string::{format_sstr, StackString};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use garmin_lib::errors::ConverterError as Error;

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WeightField {
    #[display("date")]
    Date,
    #[display("time")]
    Time,
    #[display("weight")]
    Weight,
    #[display("bmi")]
    Bmi,
    #[display("fat")]
    Fat,
}

impl WeightField {
    pub const ALL: [Self; 5] = [Self::Date, Self::Time, Self::Weight, Self::Bmi, Self::Fat];

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.to_string() == key)
    }

    fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

/// The known fields a record declared, whether or not their value was null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldSet(u8);

impl FieldSet {
    pub fn insert(&mut self, field: WeightField) {
        self.0 |= field.mask();
    }

    #[must_use]
    pub fn contains(self, field: WeightField) -> bool {
        self.0 & field.mask() != 0
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = WeightField> {
        WeightField::ALL.into_iter().filter(move |f| self.contains(*f))
    }

    fn from_keys<'a>(keys: impl IntoIterator<Item = &'a String>) -> Self {
        let mut fields = Self::default();
        for field in keys.into_iter().filter_map(|k| WeightField::from_key(k)) {
            fields.insert(field);
        }
        fields
    }
}

impl FromIterator<WeightField> for FieldSet {
    fn from_iter<T: IntoIterator<Item = WeightField>>(iter: T) -> Self {
        let mut fields = Self::default();
        for field in iter {
            fields.insert(field);
        }
        fields
    }
}

#[derive(Deserialize)]
struct FitbitWeightEntry {
    date: Option<StackString>,
    time: Option<StackString>,
    weight: Option<f64>,
    bmi: Option<f64>,
    fat: Option<f64>,
}

/// One weight log entry from a fitbit export file.
#[derive(Debug, Clone, PartialEq)]
pub struct FitbitWeight {
    pub source: Arc<Path>,
    pub index: usize,
    pub date: Option<StackString>,
    pub time: Option<StackString>,
    pub weight: Option<f64>,
    pub bmi: Option<f64>,
    pub fat: Option<f64>,
    pub fields: FieldSet,
}

/// All records from every input file, in file discovery order.
#[derive(Debug, Clone, Default)]
pub struct WeightDataset {
    pub files: Vec<PathBuf>,
    pub entries: Vec<FitbitWeight>,
}

impl WeightDataset {
    /// Fields declared by at least one record.
    #[must_use]
    pub fn fields(&self) -> FieldSet {
        self.entries
            .iter()
            .fold(FieldSet::default(), |acc, entry| acc.union(entry.fields))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// # Errors
/// Return error if the pattern is invalid or nothing matches
pub fn find_weight_files(directory: &Path, pattern: &str) -> Result<Vec<PathBuf>, Error> {
    let prefix = Pattern::escape(&directory.to_string_lossy());
    let full_pattern = format_sstr!("{prefix}/**/{pattern}");
    debug!("searching {full_pattern}");
    let files = glob(&full_pattern)?
        .filter(|f| f.as_ref().map_or(true, |p| p.is_file()))
        .collect::<Result<Vec<_>, _>>()?;
    if files.is_empty() {
        return Err(Error::NoInputFiles {
            directory: directory.to_string_lossy().as_ref().into(),
            pattern: pattern.into(),
        });
    }
    Ok(files)
}

/// # Errors
/// Return error if the file can't be read or isn't a json array of objects
pub fn read_weight_file(fname: &Path) -> Result<Vec<FitbitWeight>, Error> {
    let buf = fs::read(fname)?;
    let records: Vec<Map<String, Value>> =
        serde_json::from_slice(&buf).map_err(|e| Error::file_parse(fname, e))?;
    let source: Arc<Path> = fname.into();
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let fields = FieldSet::from_keys(record.keys());
            let entry: FitbitWeightEntry = serde_json::from_value(Value::Object(record))
                .map_err(|e| Error::file_parse(fname, e))?;
            Ok(FitbitWeight {
                source: source.clone(),
                index,
                date: entry.date,
                time: entry.time,
                weight: entry.weight,
                bmi: entry.bmi,
                fat: entry.fat,
                fields,
            })
        })
        .collect()
}

/// Read every matching file under `directory`, keeping each file's record
/// order and the order the files were found.
///
/// # Errors
/// Return error if no files match or any file fails to parse
pub fn load_weight_files(directory: &Path, pattern: &str) -> Result<WeightDataset, Error> {
    let files = find_weight_files(directory, pattern)?;
    let mut entries = Vec::new();
    for fname in &files {
        let records = read_weight_file(fname)?;
        debug!("fname {fname:?} {}", records.len());
        entries.extend(records);
    }
    entries.shrink_to_fit();
    Ok(WeightDataset { files, entries })
}
