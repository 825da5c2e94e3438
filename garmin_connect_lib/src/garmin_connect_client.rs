use base64::{engine::general_purpose::STANDARD, Engine};
use derive_more::Display;
use log::debug;
use reqwest::{header::HeaderMap, Client};
use serde::{Deserialize, Serialize};
use stack_string::{format_sstr, StackString};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};
use time::{macros::format_description, OffsetDateTime, UtcOffset};
use tokio::fs;
use url::Url;

use garmin_lib::{errors::ConverterError as Error, garmin_config::GarminConfig};

use crate::weight_upload::WeightSubmitter;

const HTTP_USER_AGENT: &str = "GCM-iOS-5.7.2.1";

#[derive(Serialize, Deserialize, Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightUnit {
    #[default]
    #[serde(rename = "kg")]
    #[display("kg")]
    Kg,
    #[serde(rename = "lbs")]
    #[display("lbs")]
    Lbs,
}

impl FromStr for WeightUnit {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kg" => Ok(Self::Kg),
            "lbs" => Ok(Self::Lbs),
            _ => Err(format!("unit must be one of kg, lbs, got {s}")),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct OAuth1Token {
    oauth_token: StackString,
    oauth_token_secret: StackString,
    #[serde(default)]
    mfa_token: Option<StackString>,
    #[serde(default)]
    domain: Option<StackString>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct OAuth2Token {
    scope: StackString,
    jti: StackString,
    token_type: StackString,
    access_token: StackString,
    refresh_token: StackString,
    expires_in: i64,
    expires_at: i64,
    refresh_token_expires_in: i64,
    refresh_token_expires_at: i64,
}

impl OAuth2Token {
    fn expired(&self) -> bool {
        self.expires_at < OffsetDateTime::now_utc().unix_timestamp()
    }

    fn auth_header(&self) -> StackString {
        let access_token = &self.access_token;
        format_sstr!("Bearer {access_token}")
    }
}

#[derive(Serialize, Debug)]
struct WeighInPayload {
    #[serde(rename = "dateTimestamp")]
    date_timestamp: StackString,
    #[serde(rename = "gmtTimestamp")]
    gmt_timestamp: StackString,
    #[serde(rename = "unitKey")]
    unit_key: WeightUnit,
    #[serde(rename = "sourceType")]
    source_type: &'static str,
    value: f64,
}

impl WeighInPayload {
    fn new(weight: f64, unit: WeightUnit, timestamp: OffsetDateTime) -> Result<Self, Error> {
        let fmt = format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]"
        );
        let date_timestamp = timestamp.format(fmt)?.into();
        let gmt_timestamp = timestamp.to_offset(UtcOffset::UTC).format(fmt)?.into();
        Ok(Self {
            date_timestamp,
            gmt_timestamp,
            unit_key: unit,
            source_type: "MANUAL",
            value: weight,
        })
    }
}

#[derive(Default, Debug)]
pub struct GarminConnectClient {
    pub config: GarminConfig,
    pub client: Client,
    oauth1_token: Option<OAuth1Token>,
    oauth2_token: Option<OAuth2Token>,
}

impl GarminConnectClient {
    /// Builds the client without touching the network or the token store.
    ///
    /// # Errors
    /// Returns error if client configuration fails
    pub fn new(config: GarminConfig) -> Result<Self, Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            config,
            client,
            ..Self::default()
        })
    }

    /// # Errors
    /// Returns error if no usable token is found in the token store
    pub async fn init(&mut self) -> Result<(), Error> {
        self.load().await?;
        let oauth2_token = self
            .oauth2_token
            .as_ref()
            .ok_or_else(|| Error::Authentication("No Oauth2 Token".into()))?;
        if oauth2_token.expired() {
            return Err(Error::Authentication(
                "Oauth2 Token Expired, log in again to refresh the token store".into(),
            ));
        }
        Ok(())
    }

    /// Load tokens either from an inline base64 blob or from the
    /// `oauth1_token.json` / `oauth2_token.json` pair in the store directory.
    ///
    /// # Errors
    /// Returns error if reading or deserializing the tokens fails
    pub async fn load(&mut self) -> Result<(), Error> {
        let (oauth1_token, oauth2_token) = if self.config.token_store_is_inline() {
            Self::decode_tokens(&self.config.garmin_token_store)?
        } else {
            let store = self.token_store_path();
            debug!("loading tokens from {store:?}");
            let oauth1_token = Self::read_token(&store.join("oauth1_token.json")).await?;
            let oauth2_token = Self::read_token(&store.join("oauth2_token.json")).await?;
            (oauth1_token, oauth2_token)
        };
        self.oauth1_token.replace(oauth1_token);
        self.oauth2_token.replace(oauth2_token);
        Ok(())
    }

    fn token_store_path(&self) -> PathBuf {
        let store = self.config.garmin_token_store.as_str();
        match store.strip_prefix("~/") {
            Some(rest) => self.config.home_dir.join(rest),
            None => Path::new(store).to_path_buf(),
        }
    }

    async fn read_token<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, Error> {
        let buf = fs::read(path)
            .await
            .map_err(|e| Error::Authentication(format_sstr!("failed to read {path:?}: {e}")))?;
        serde_json::from_slice(&buf)
            .map_err(|e| Error::Authentication(format_sstr!("failed to parse {path:?}: {e}")))
    }

    fn decode_tokens(blob: &str) -> Result<(OAuth1Token, OAuth2Token), Error> {
        let buf = STANDARD
            .decode(blob.trim())
            .map_err(|e| Error::Authentication(format_sstr!("bad token blob: {e}")))?;
        serde_json::from_slice(&buf)
            .map_err(|e| Error::Authentication(format_sstr!("bad token blob: {e}")))
    }

    /// # Errors
    /// Returns error if the weight is not positive or the api call fails
    pub async fn add_weigh_in(
        &self,
        weight: f64,
        unit: WeightUnit,
        timestamp: OffsetDateTime,
    ) -> Result<(), Error> {
        if weight <= 0.0 || !weight.is_finite() {
            return Err(Error::CustomError(format_sstr!(
                "weight must be positive, got {weight}"
            )));
        }
        let payload = WeighInPayload::new(weight, unit, timestamp)?;
        debug!("Adding weigh-in {payload:?}");
        let url = self.api_url("/weight-service/user-weight")?;
        let headers = self.api_headers()?;
        self.client
            .post(url)
            .headers(headers)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.config.garmin_connect_api_url.trim_end_matches('/');
        format_sstr!("{base}{path}").parse().map_err(Into::into)
    }

    fn api_headers(&self) -> Result<HeaderMap, Error> {
        let oauth2_token = self
            .oauth2_token
            .as_ref()
            .ok_or_else(|| Error::Authentication("No Oauth2 Token".into()))?;
        if oauth2_token.expired() {
            return Err(Error::Authentication("Oauth2 Token Expired".into()));
        }
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", oauth2_token.auth_header().parse()?);
        headers.insert("User-Agent", HTTP_USER_AGENT.parse()?);
        Ok(headers)
    }
}

impl WeightSubmitter for GarminConnectClient {
    async fn submit_weight(
        &self,
        weight: f64,
        unit: WeightUnit,
        timestamp: OffsetDateTime,
    ) -> Result<(), Error> {
        self.add_weigh_in(weight, unit, timestamp).await
    }
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use std::fs;
    use tempfile::TempDir;
    use time::{macros::datetime, OffsetDateTime};

    use garmin_lib::{
        errors::ConverterError as Error,
        garmin_config::{GarminConfig, GarminConfigInner},
    };

    use crate::garmin_connect_client::{GarminConnectClient, WeighInPayload, WeightUnit};

    const OAUTH1: &str = r#"{"oauth_token": "token1", "oauth_token_secret": "secret1", "mfa_token": null, "mfa_expiration_timestamp": null, "domain": "garmin.com"}"#;

    fn oauth2(expires_at: i64) -> String {
        format!(
            r#"{{"scope": "COMMUNITY_COURSE_READ COMMUNITY_COURSE_WRITE CONNECT_READ CONNECT_WRITE", "jti": "0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0", "token_type": "Bearer", "access_token": "access", "refresh_token": "refresh", "expires_in": 3600, "expires_at": {expires_at}, "refresh_token_expires_in": 7200, "refresh_token_expires_at": {expires_at}}}"#
        )
    }

    fn config_with_store(store: &str) -> GarminConfig {
        GarminConfigInner {
            garmin_token_store: store.into(),
            ..GarminConfigInner::new()
        }
        .into()
    }

    #[test]
    fn test_weight_unit() {
        assert_eq!("kg".parse::<WeightUnit>(), Ok(WeightUnit::Kg));
        assert_eq!("lbs".parse::<WeightUnit>(), Ok(WeightUnit::Lbs));
        assert!("stone".parse::<WeightUnit>().is_err());
        assert_eq!(WeightUnit::Lbs.to_string(), "lbs");
    }

    #[test]
    fn test_weigh_in_payload() -> Result<(), Error> {
        let timestamp = datetime!(2024-01-01 08:00:00 -5);
        let payload = WeighInPayload::new(81.5, WeightUnit::Kg, timestamp)?;
        let js = serde_json::to_value(&payload)?;
        assert_eq!(js["dateTimestamp"], "2024-01-01T08:00:00.000");
        assert_eq!(js["gmtTimestamp"], "2024-01-01T13:00:00.000");
        assert_eq!(js["unitKey"], "kg");
        assert_eq!(js["sourceType"], "MANUAL");
        assert_eq!(js["value"], 81.5);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_token_directory() -> Result<(), Error> {
        let dir = TempDir::new()?;
        let expires_at = OffsetDateTime::now_utc().unix_timestamp() + 3600;
        fs::write(dir.path().join("oauth1_token.json"), OAUTH1)?;
        fs::write(dir.path().join("oauth2_token.json"), oauth2(expires_at))?;

        let config = config_with_store(&dir.path().to_string_lossy());
        let mut client = GarminConnectClient::new(config)?;
        client.init().await?;
        let token = client.oauth2_token.as_ref().unwrap();
        assert_eq!(token.auth_header().as_str(), "Bearer access");
        assert!(client.api_headers().is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_or_missing_tokens() -> Result<(), Error> {
        let dir = TempDir::new()?;
        let config = config_with_store(&dir.path().to_string_lossy());
        let mut client = GarminConnectClient::new(config.clone())?;
        assert!(matches!(
            client.init().await,
            Err(Error::Authentication(_))
        ));

        fs::write(dir.path().join("oauth1_token.json"), OAUTH1)?;
        fs::write(dir.path().join("oauth2_token.json"), oauth2(1_000))?;
        let mut client = GarminConnectClient::new(config)?;
        assert!(matches!(
            client.init().await,
            Err(Error::Authentication(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_inline_tokens() -> Result<(), Error> {
        let expires_at = OffsetDateTime::now_utc().unix_timestamp() + 3600;
        let pair = format!("[{OAUTH1}, {}]", oauth2(expires_at));
        let blob = STANDARD.encode(pair.as_bytes());
        assert!(blob.len() > 512);

        let mut client = GarminConnectClient::new(config_with_store(&blob))?;
        client.init().await?;
        assert_eq!(
            client.oauth1_token.as_ref().map(|t| t.oauth_token.as_str()),
            Some("token1")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_non_positive_weight() -> Result<(), Error> {
        let client = GarminConnectClient::new(GarminConfig::new())?;
        let timestamp = datetime!(2024-01-01 08:00:00 UTC);
        assert!(client
            .add_weigh_in(0.0, WeightUnit::Kg, timestamp)
            .await
            .is_err());
        Ok(())
    }
}
