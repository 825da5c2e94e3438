#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod garmin_cli;
pub mod garmin_cli_opts;
