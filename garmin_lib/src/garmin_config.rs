#![allow(clippy::wrong_self_convention)]

use stack_string::StackString;
use std::{
    env::var,
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::errors::ConverterError as Error;

pub const DEFAULT_API_URL: &str = "https://connectapi.garmin.com";
pub const DEFAULT_GLOB_PATTERN: &str = "weight*.json";
pub const DEFAULT_OUTPUT_FILE: &str = "weight_data.csv";

/// `GarminConfig` holds configuration information which can be set either
/// through environment variables or the config.env file, see the dotenvy crate
/// for more information about the config file format.
#[derive(Default, Debug)]
pub struct GarminConfigInner {
    pub home_dir: PathBuf,
    pub garmin_token_store: StackString,
    pub garmin_connect_api_url: StackString,
    pub default_timezone: StackString,
    pub weight_glob_pattern: StackString,
    pub weight_output_file: PathBuf,
}

#[derive(Default, Debug, Clone)]
pub struct GarminConfig(Arc<GarminConfigInner>);

macro_rules! set_config_from_env {
    ($s:ident, $id:ident) => {
        if let Ok($id) = var(&stringify!($id).to_uppercase()) {
            $s.$id = $id.into()
        }
    };
}

impl GarminConfigInner {
    /// Some variables have natural default values, which we set in the new()
    /// method.
    pub fn new() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| Path::new("/tmp").to_path_buf());
        let garmin_token_store = home_dir
            .join(".garminconnect")
            .to_string_lossy()
            .to_string()
            .into();

        Self {
            garmin_token_store,
            garmin_connect_api_url: DEFAULT_API_URL.into(),
            default_timezone: "UTC".into(),
            weight_glob_pattern: DEFAULT_GLOB_PATTERN.into(),
            weight_output_file: DEFAULT_OUTPUT_FILE.into(),
            home_dir,
        }
    }

    /// Each variable maps to an environment variable, if the variable exists,
    /// use it.
    pub fn from_env(mut self) -> Self {
        if let Ok(token_store) = var("GARMINTOKENS") {
            self.garmin_token_store = token_store.into();
        }
        set_config_from_env!(self, garmin_connect_api_url);
        set_config_from_env!(self, default_timezone);
        set_config_from_env!(self, weight_glob_pattern);
        set_config_from_env!(self, weight_output_file);
        self
    }
}

impl GarminConfig {
    pub fn new() -> Self {
        Self(Arc::new(GarminConfigInner::new()))
    }

    /// Pull configuration from a file if it exists,
    /// first look for the explicitly requested file,
    /// then try `${CONFIG_DIR}/fitbit_garmin_converter/config.env`,
    /// then a config.env file in the current directory,
    /// and finally fall back on the default behaviour of dotenvy.
    pub fn get_config(fname: Option<&Path>) -> Result<Self, Error> {
        let default_fname = dirs::config_dir()
            .ok_or_else(|| Error::CustomError("No CONFIG directory".into()))?
            .join("fitbit_garmin_converter")
            .join("config.env");

        let env_file = match fname {
            Some(fname) if fname.exists() => fname,
            _ => default_fname.as_path(),
        };

        if env_file.exists() {
            dotenvy::from_path(env_file).ok();
        } else if Path::new("config.env").exists() {
            dotenvy::from_filename("config.env").ok();
        } else {
            dotenvy::dotenv().ok();
        }

        let conf = GarminConfigInner::new().from_env();

        if conf.garmin_connect_api_url.is_empty() {
            Err(Error::CustomError("No GARMIN_CONNECT_API_URL specified".into()))
        } else {
            Ok(Self(Arc::new(conf)))
        }
    }

    /// An inline token blob rather than a path to a token directory.
    pub fn token_store_is_inline(&self) -> bool {
        self.garmin_token_store.len() > 512
    }
}

impl From<GarminConfigInner> for GarminConfig {
    fn from(inner: GarminConfigInner) -> Self {
        Self(Arc::new(inner))
    }
}

impl Deref for GarminConfig {
    type Target = GarminConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
