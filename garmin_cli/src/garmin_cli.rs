use anyhow::Error;
use log::debug;
use stack_string::{format_sstr, StackString};
use std::path::{Path, PathBuf};
use stdout_channel::StdoutChannel;
use tokio::task::spawn_blocking;

use fitbit_lib::weight_conversion::{
    convert_weight_to_csv, load_upload_timeline, OutputMode, WeightConversion,
};
use garmin_connect_lib::{
    garmin_connect_client::{GarminConnectClient, WeightUnit},
    weight_upload::{upload_weights, UploadSummary},
};
use garmin_lib::{garmin_config::GarminConfig, garmin_timezone::GarminTz};

#[derive(Debug, PartialEq, Clone)]
pub enum GarminCliOptions {
    ConvertWeight {
        input_dir: PathBuf,
        glob_pattern: StackString,
        output_file: PathBuf,
        mode: OutputMode,
    },
    UploadToGarmin {
        input_dir: PathBuf,
        glob_pattern: StackString,
        unit: WeightUnit,
        timezone_name: StackString,
        dry_run: bool,
    },
}

#[derive(Debug, Default)]
pub struct GarminCli {
    pub config: GarminConfig,
    pub opts: Option<GarminCliOptions>,
    pub stdout: StdoutChannel<StackString>,
}

impl GarminCli {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GarminConfig::new(),
            ..Self::default()
        }
    }

    /// Run the selected command with console output routed through
    /// `self.stdout`.
    ///
    /// # Errors
    /// Return error if the command fails
    pub async fn run(&self) -> Result<(), Error> {
        let result = self.dispatch().await;
        self.stdout.close().await?;
        result
    }

    async fn dispatch(&self) -> Result<(), Error> {
        match &self.opts {
            Some(GarminCliOptions::ConvertWeight {
                input_dir,
                glob_pattern,
                output_file,
                mode,
            }) => {
                let conversion = self
                    .convert_weight(input_dir, glob_pattern, output_file, *mode)
                    .await?;
                self.stdout.send(format_sstr!(
                    "Converted {} records to {}",
                    conversion.record_count,
                    output_file.display()
                ));
            }
            Some(GarminCliOptions::UploadToGarmin {
                input_dir,
                glob_pattern,
                unit,
                timezone_name,
                dry_run,
            }) => {
                self.upload_to_garmin(input_dir, glob_pattern, *unit, timezone_name, *dry_run)
                    .await?;
            }
            None => debug!("nothing to do"),
        }
        Ok(())
    }

    /// # Errors
    /// Return error if loading, validation, parsing or writing fails
    pub async fn convert_weight(
        &self,
        input_dir: &Path,
        glob_pattern: &str,
        output_file: &Path,
        mode: OutputMode,
    ) -> Result<WeightConversion, Error> {
        let input_dir = input_dir.to_path_buf();
        let glob_pattern: StackString = glob_pattern.into();
        let output_file = output_file.to_path_buf();
        let conversion = spawn_blocking(move || {
            convert_weight_to_csv(&input_dir, &glob_pattern, &output_file, mode)
        })
        .await??;
        Ok(conversion)
    }

    /// Validation happens before any network access; a dry run never touches
    /// the token store.
    ///
    /// # Errors
    /// Return error if the input or zone is invalid, authentication fails or
    /// too many submissions fail
    pub async fn upload_to_garmin(
        &self,
        input_dir: &Path,
        glob_pattern: &str,
        unit: WeightUnit,
        timezone_name: &str,
        dry_run: bool,
    ) -> Result<UploadSummary, Error> {
        let tz: GarminTz = timezone_name.parse()?;
        let input_dir = input_dir.to_path_buf();
        let glob_pattern: StackString = glob_pattern.into();
        let timeline =
            spawn_blocking(move || load_upload_timeline(&input_dir, &glob_pattern)).await??;
        debug!("{} weigh-ins to upload in {tz}", timeline.len());

        let mut client = GarminConnectClient::new(self.config.clone())?;
        if !dry_run {
            client.init().await?;
        }
        let summary =
            upload_weights(&client, &timeline, unit, tz, dry_run, &self.stdout).await?;
        Ok(summary)
    }
}
