#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]

pub mod daily_weight;
pub mod fitbit_weight;
pub mod weight_conversion;
pub mod weight_csv;
pub mod weight_schema;
pub mod weight_timestamp;
