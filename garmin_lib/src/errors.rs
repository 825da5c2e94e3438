use base64::DecodeError;
use csv::Error as CsvError;
use glob::{GlobError, PatternError};
use reqwest::{header::InvalidHeaderValue, Error as ReqwestError};
use serde_json::Error as SerdeJsonError;
use stack_string::StackString;
use std::path::PathBuf;
use stdout_channel::StdoutChannelError;
use thiserror::Error;
use time::error::Format as TimeFormatError;
use url::ParseError as UrlParseError;

fn join_names(names: &[StackString]) -> String {
    names
        .iter()
        .map(StackString::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum ConverterError {
    #[error("No files found matching {pattern} in {directory}")]
    NoInputFiles {
        directory: StackString,
        pattern: StackString,
    },
    #[error("Failed to parse {path:?}: {error}")]
    FileParse {
        path: PathBuf,
        #[source]
        error: Box<SerdeJsonError>,
    },
    #[error("Missing required fields: {}", join_names(.0))]
    MissingFields(Vec<StackString>),
    #[error("Record {index} in {path:?} has no {field} value")]
    MissingValue {
        path: PathBuf,
        index: usize,
        field: StackString,
    },
    #[error("Invalid timestamp {value:?} in {path:?}: {error}")]
    TimestampParse {
        path: PathBuf,
        value: StackString,
        error: StackString,
    },
    #[error("{0} is not a valid timezone")]
    InvalidTimeZone(StackString),
    #[error("Authentication failed: {0}")]
    Authentication(StackString),
    #[error("Failed to submit weight for {timestamp}: {error}")]
    Submission {
        timestamp: StackString,
        error: StackString,
    },
    #[error("Too many errors ({errors}), aborting after exceeding {max} failed submissions")]
    ErrorBudgetExceeded { errors: usize, max: usize },
    #[error("io Error {0}")]
    IoError(#[from] std::io::Error),
    #[error("GlobError {0}")]
    GlobError(#[from] GlobError),
    #[error("PatternError {0}")]
    PatternError(#[from] PatternError),
    #[error("SerdeJsonError {0}")]
    SerdeJsonError(#[from] SerdeJsonError),
    #[error("CsvError {0}")]
    CsvError(#[from] CsvError),
    #[error("ReqwestError {0}")]
    ReqwestError(#[from] ReqwestError),
    #[error("UrlParseError {0}")]
    UrlParseError(#[from] UrlParseError),
    #[error("InvalidHeaderValue {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),
    #[error("TimeFormatError {0}")]
    TimeFormatError(#[from] TimeFormatError),
    #[error("Base64DecodeError {0}")]
    DecodeError(#[from] DecodeError),
    #[error("StdoutChannelError {0}")]
    StdoutChannelError(#[from] StdoutChannelError),
    #[error("{0}")]
    CustomError(StackString),
}

impl ConverterError {
    /// Parse failures are always attributed to the file that produced them.
    pub fn file_parse(path: impl Into<PathBuf>, error: SerdeJsonError) -> Self {
        Self::FileParse {
            path: path.into(),
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use stack_string::StackString;
    use std::path::Path;

    use crate::errors::ConverterError as Error;

    #[test]
    fn test_missing_fields_lists_every_field() {
        let err = Error::MissingFields(vec!["bmi".into(), "time".into()]);
        assert_eq!(err.to_string(), "Missing required fields: bmi, time");
    }

    #[test]
    fn test_file_parse_names_file() {
        let json_err = serde_json::from_str::<Vec<i32>>("[1,").unwrap_err();
        let err = Error::file_parse(Path::new("/tmp/weight-2024-01-01.json"), json_err);
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse \"/tmp/weight-2024-01-01.json\""));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_budget_message() {
        let err = Error::ErrorBudgetExceeded { errors: 11, max: 10 };
        assert_eq!(
            err.to_string(),
            "Too many errors (11), aborting after exceeding 10 failed submissions"
        );
        let tz: StackString = "Mars/Olympus_Mons".into();
        assert_eq!(
            Error::InvalidTimeZone(tz).to_string(),
            "Mars/Olympus_Mons is not a valid timezone"
        );
    }
}
