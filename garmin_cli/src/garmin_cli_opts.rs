use anyhow::Error;
use clap::Parser;
use std::path::PathBuf;

use fitbit_lib::weight_conversion::OutputMode;
use garmin_connect_lib::garmin_connect_client::WeightUnit;
use garmin_lib::garmin_config::GarminConfig;

use crate::garmin_cli::{GarminCli, GarminCliOptions};

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(author, version, about = "Convert Fitbit weight exports for Garmin Connect")]
pub enum GarminCliOpts {
    /// Write the Fitbit weight export as a Garmin weight CSV
    ConvertWeight {
        input_dir: PathBuf,
        #[arg(short, long)]
        glob_pattern: Option<String>,
        #[arg(short, long)]
        output_file: Option<PathBuf>,
        /// One row per day instead of one row per measurement
        #[arg(short, long)]
        daily: bool,
    },
    /// Upload each weigh-in to Garmin Connect
    UploadToGarmin {
        input_dir: PathBuf,
        #[arg(short, long)]
        glob_pattern: Option<String>,
        #[arg(short, long, default_value = "kg")]
        unit: WeightUnit,
        #[arg(short, long)]
        timezone_name: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
}

impl GarminCliOpts {
    /// # Errors
    /// Return error if config loading or the command fails
    pub async fn process_args() -> Result<(), Error> {
        let config = GarminConfig::get_config(None)?;
        let opts = Self::parse().into_options(&config);
        let cli = GarminCli {
            config,
            opts: Some(opts),
            ..GarminCli::default()
        };
        cli.run().await
    }

    /// Fill unset arguments from `config`.
    #[must_use]
    pub fn into_options(self, config: &GarminConfig) -> GarminCliOptions {
        match self {
            Self::ConvertWeight {
                input_dir,
                glob_pattern,
                output_file,
                daily,
            } => GarminCliOptions::ConvertWeight {
                input_dir,
                glob_pattern: glob_pattern
                    .map_or_else(|| config.weight_glob_pattern.clone(), Into::into),
                output_file: output_file.unwrap_or_else(|| config.weight_output_file.clone()),
                mode: if daily {
                    OutputMode::Daily
                } else {
                    OutputMode::Full
                },
            },
            Self::UploadToGarmin {
                input_dir,
                glob_pattern,
                unit,
                timezone_name,
                dry_run,
            } => GarminCliOptions::UploadToGarmin {
                input_dir,
                glob_pattern: glob_pattern
                    .map_or_else(|| config.weight_glob_pattern.clone(), Into::into),
                unit,
                timezone_name: timezone_name
                    .map_or_else(|| config.default_timezone.clone(), Into::into),
                dry_run,
            },
        }
    }
}
