use log::{debug, error, info};
use stack_string::{format_sstr, StackString};
use stdout_channel::StdoutChannel;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use fitbit_lib::weight_timestamp::WeightMeasurement;
use garmin_lib::{errors::ConverterError as Error, garmin_timezone::GarminTz};

use crate::{failure_count::FailureCount, garmin_connect_client::WeightUnit};

pub const MAX_SUBMISSION_ERRORS: usize = 10;
pub const DRY_RUN_PREVIEW: usize = 5;

/// Anything able to record a single weigh-in.
#[allow(async_fn_in_trait)]
pub trait WeightSubmitter {
    /// # Errors
    /// Returns error if the weigh-in was not accepted
    async fn submit_weight(
        &self,
        weight: f64,
        unit: WeightUnit,
        timestamp: OffsetDateTime,
    ) -> Result<(), Error>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub success_count: usize,
    pub error_count: usize,
}

/// First `DRY_RUN_PREVIEW` weigh-ins as `<timestamp> <weight> <unit>`, followed
/// by a count of the remainder.
///
/// # Errors
/// Returns error if a timestamp can't be formatted
pub fn dry_run_preview(
    timeline: &[WeightMeasurement],
    unit: WeightUnit,
    tz: GarminTz,
) -> Result<Vec<StackString>, Error> {
    let mut lines = timeline
        .iter()
        .take(DRY_RUN_PREVIEW)
        .map(|m| -> Result<StackString, Error> {
            let timestamp = m.with_timezone(tz).format(&Rfc3339)?;
            let weight = m.weight;
            Ok(format_sstr!("{timestamp} {weight} {unit}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if timeline.len() > DRY_RUN_PREVIEW {
        let remaining = timeline.len() - DRY_RUN_PREVIEW;
        lines.push(format_sstr!("...and {remaining} more"));
    }
    Ok(lines)
}

/// Submit every measurement in order, one at a time. Failures are logged and
/// counted; the run aborts once more than `MAX_SUBMISSION_ERRORS` have failed.
///
/// # Errors
/// Returns `ErrorBudgetExceeded` when too many submissions fail
pub async fn upload_weights<S: WeightSubmitter>(
    submitter: &S,
    timeline: &[WeightMeasurement],
    unit: WeightUnit,
    tz: GarminTz,
    dry_run: bool,
    stdout: &StdoutChannel<StackString>,
) -> Result<UploadSummary, Error> {
    if dry_run {
        info!("dry run, {} weigh-ins would be uploaded", timeline.len());
        for line in dry_run_preview(timeline, unit, tz)? {
            stdout.send(line);
        }
        return Ok(UploadSummary::default());
    }

    let failures = FailureCount::new(MAX_SUBMISSION_ERRORS);
    let mut success_count = 0;
    for measurement in timeline {
        let timestamp = measurement.with_timezone(tz);
        let weight = measurement.weight;
        let result = if weight > 0.0 {
            submitter.submit_weight(weight, unit, timestamp).await
        } else {
            Err(Error::Submission {
                timestamp: format_sstr!("{timestamp}"),
                error: format_sstr!("weight must be positive, got {weight}"),
            })
        };
        match result {
            Ok(()) => {
                debug!("uploaded {weight} {unit} at {timestamp}");
                success_count += 1;
            }
            Err(e) => {
                error!("Failed to upload {weight} {unit} at {timestamp}: {e}");
                failures.increment()?;
            }
        }
    }
    let summary = UploadSummary {
        success_count,
        error_count: failures.count(),
    };
    info!(
        "uploaded {} weigh-ins with {} errors",
        summary.success_count, summary.error_count
    );
    stdout.send(format_sstr!(
        "Uploaded {} weigh-ins, {} failed",
        summary.success_count,
        summary.error_count
    ));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use stack_string::{format_sstr, StackString};
    use std::{
        path::Path,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };
    use stdout_channel::{MockStdout, StdoutChannel};
    use time::{macros::datetime, Duration, OffsetDateTime};

    use fitbit_lib::weight_timestamp::WeightMeasurement;
    use garmin_lib::{errors::ConverterError as Error, garmin_timezone::GarminTz};

    use crate::{
        garmin_connect_client::WeightUnit,
        weight_upload::{
            dry_run_preview, upload_weights, UploadSummary, WeightSubmitter,
            MAX_SUBMISSION_ERRORS,
        },
    };

    #[derive(Default)]
    struct MockSubmitter {
        calls: AtomicUsize,
        fail_every: usize,
    }

    impl WeightSubmitter for MockSubmitter {
        async fn submit_weight(
            &self,
            _weight: f64,
            _unit: WeightUnit,
            timestamp: OffsetDateTime,
        ) -> Result<(), Error> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_every > 0 && call % self.fail_every == 0 {
                Err(Error::Submission {
                    timestamp: format_sstr!("{timestamp}"),
                    error: "503 Service Unavailable".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn timeline(n: usize) -> Vec<WeightMeasurement> {
        let source: Arc<Path> = Path::new("weight-2024-01-01.json").into();
        (0..n)
            .map(|i| WeightMeasurement {
                source: source.clone(),
                datetime: datetime!(2024-01-01 08:00:00) + Duration::days(i as i64),
                weight: 80.0 + i as f64,
                bmi: None,
                fat: None,
            })
            .collect()
    }

    #[test]
    fn test_dry_run_preview() -> Result<(), Error> {
        let tz: GarminTz = "America/New_York".parse()?;
        let lines = dry_run_preview(&timeline(7), WeightUnit::Kg, tz)?;
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0].as_str(), "2024-01-01T08:00:00-05:00 80 kg");
        assert_eq!(lines[5].as_str(), "...and 2 more");

        let lines = dry_run_preview(&timeline(3), WeightUnit::Lbs, GarminTz::default())?;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].as_str(), "2024-01-03T08:00:00Z 82 lbs");
        Ok(())
    }

    #[tokio::test]
    async fn test_dry_run_never_submits() -> Result<(), Error> {
        let submitter = MockSubmitter::default();
        let mock_stdout = MockStdout::<StackString>::new();
        let stdout = StdoutChannel::with_mock_stdout(mock_stdout.clone(), MockStdout::new());
        let summary = upload_weights(
            &submitter,
            &timeline(7),
            WeightUnit::Kg,
            GarminTz::default(),
            true,
            &stdout,
        )
        .await?;
        stdout.close().await?;
        assert_eq!(summary, UploadSummary::default());
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 0);

        let lines = mock_stdout.lock().await;
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0].as_str(), "2024-01-01T08:00:00Z 80 kg");
        assert_eq!(lines[4].as_str(), "2024-01-05T08:00:00Z 84 kg");
        assert_eq!(lines[5].as_str(), "...and 2 more");
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_failures_are_counted() -> Result<(), Error> {
        let submitter = MockSubmitter {
            fail_every: 3,
            ..MockSubmitter::default()
        };
        let stdout = StdoutChannel::<StackString>::new();
        let summary = upload_weights(
            &submitter,
            &timeline(9),
            WeightUnit::Kg,
            GarminTz::default(),
            false,
            &stdout,
        )
        .await?;
        assert_eq!(summary.success_count, 6);
        assert_eq!(summary.error_count, 3);
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 9);
        Ok(())
    }

    #[tokio::test]
    async fn test_error_budget_aborts_run() -> Result<(), Error> {
        let submitter = MockSubmitter {
            fail_every: 1,
            ..MockSubmitter::default()
        };
        let stdout = StdoutChannel::<StackString>::new();
        let result = upload_weights(
            &submitter,
            &timeline(20),
            WeightUnit::Kg,
            GarminTz::default(),
            false,
            &stdout,
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::ErrorBudgetExceeded { errors: 11, max }) if max == MAX_SUBMISSION_ERRORS
        ));
        assert_eq!(submitter.calls.load(Ordering::SeqCst), MAX_SUBMISSION_ERRORS + 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_non_positive_weight_is_a_failure() -> Result<(), Error> {
        let submitter = MockSubmitter::default();
        let mut samples = timeline(3);
        samples[1].weight = 0.0;
        let stdout = StdoutChannel::<StackString>::new();
        let summary = upload_weights(
            &submitter,
            &samples,
            WeightUnit::Kg,
            GarminTz::default(),
            false,
            &stdout,
        )
        .await?;
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.error_count, 1);
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 2);
        Ok(())
    }
}
