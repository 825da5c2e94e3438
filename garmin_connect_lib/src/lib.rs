#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod failure_count;
pub mod garmin_connect_client;
pub mod weight_upload;
