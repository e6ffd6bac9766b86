// gbfs_exporter - Prometheus metrics exporter for GBFS bikeshare feeds
//
// Copyright 2024 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::error;
use std::fmt;

#[derive(Debug)]
pub enum ClientError {
    InvalidUrl(String),
    Transport(reqwest::Error),
    Unexpected(StatusCode, Url),
    Body(reqwest::Error, Url),
    Decode(serde_json::Error, Url),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(s) => write!(f, "invalid feed URL {}", s),
            Self::Transport(e) => write!(f, "{}", e),
            Self::Unexpected(status, url) => write!(f, "unexpected status {} for {}", status, url),
            Self::Body(e, url) => write!(f, "unable to read body of {}: {}", url, e),
            Self::Decode(e, url) => write!(f, "unable to decode {}: {}", url, e),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Body(e, _) => Some(e),
            Self::Decode(e, _) => Some(e),
            _ => None,
        }
    }
}

/// One of the GBFS documents published under the feed base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    StationInformation,
    StationStatus,
    FreeBikeStatus,
}

impl Feed {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::StationInformation => "station_information.json",
            Self::StationStatus => "station_status.json",
            Self::FreeBikeStatus => "free_bike_status.json",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StationInformation => "station_information",
            Self::StationStatus => "station_status",
            Self::FreeBikeStatus => "free_bike_status",
        };

        f.write_str(name)
    }
}

/// Client for fetching and decoding the GBFS feeds of a single bikeshare system.
///
/// Each method performs exactly one request. Nothing is retried: callers are expected
/// to try again on their next scheduled pass.
#[derive(Debug)]
pub struct GbfsClient {
    client: Client,
    station_information_url: Url,
    station_status_url: Url,
    free_bike_status_url: Url,
}

impl GbfsClient {
    const USER_AGENT: &'static str = "GBFS Prometheus Exporter (https://github.com/56quarters/gbfs_exporter)";
    const JSON_RESPONSE: &'static str = "application/json";

    /// Create a new client for feeds published under `base_url`, for example
    /// `https://gbfs.baywheels.com/gbfs/en`.
    pub fn new(client: Client, base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        Ok(GbfsClient {
            client,
            station_information_url: Self::feed_url(&base, Feed::StationInformation)?,
            station_status_url: Self::feed_url(&base, Feed::StationStatus)?,
            free_bike_status_url: Self::feed_url(&base, Feed::FreeBikeStatus)?,
        })
    }

    pub async fn station_information(&self) -> Result<Vec<StationInfo>, ClientError> {
        let data: StationInformationData = self.fetch(Feed::StationInformation).await?;
        Ok(data.stations)
    }

    pub async fn station_status(&self) -> Result<Vec<StationStatus>, ClientError> {
        let data: StationStatusData = self.fetch(Feed::StationStatus).await?;
        Ok(data.stations)
    }

    pub async fn free_bike_status(&self) -> Result<Vec<BikeStatus>, ClientError> {
        let data: FreeBikeStatusData = self.fetch(Feed::FreeBikeStatus).await?;
        Ok(data.bikes)
    }

    async fn fetch<T: DeserializeOwned>(&self, feed: Feed) -> Result<T, ClientError> {
        let url = self.url(feed);
        tracing::debug!(message = "making feed request", feed = %feed, url = %url);

        let res = self
            .client
            .get(url.clone())
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = res.status();
        if !status.is_success() {
            return Err(ClientError::Unexpected(status, url.clone()));
        }

        let body = res.bytes().await.map_err(|e| ClientError::Body(e, url.clone()))?;
        let envelope = serde_json::from_slice::<Envelope<T>>(&body).map_err(|e| ClientError::Decode(e, url.clone()))?;

        tracing::debug!(
            message = "decoded feed",
            feed = %feed,
            num_bytes = body.len(),
            last_updated = %envelope.last_updated,
            ttl = %envelope.ttl,
        );

        Ok(envelope.data)
    }

    fn url(&self, feed: Feed) -> &Url {
        match feed {
            Feed::StationInformation => &self.station_information_url,
            Feed::StationStatus => &self.station_status_url,
            Feed::FreeBikeStatus => &self.free_bike_status_url,
        }
    }

    fn feed_url(base: &Url, feed: Feed) -> Result<Url, ClientError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .push(feed.file_name());

        Ok(url)
    }
}

/// Flags are published as 0/1 integers. Some systems publish booleans instead,
/// those are mapped to the same 0/1 values. `null` is 0.
fn flag<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Int(i64),
        Bool(bool),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Int(v)) => v,
        Some(Flag::Bool(b)) => i64::from(b),
        None => 0,
    })
}

/// Fields published as `null` get their default value, the same as missing fields.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize, Debug)]
struct Envelope<T> {
    // Integers in GBFS 1.x and 2.x, RFC 3339 strings in 3.x. Only logged.
    #[serde(default)]
    last_updated: serde_json::Value,
    #[serde(default)]
    ttl: serde_json::Value,
    data: T,
}

#[derive(Deserialize, Debug)]
struct StationInformationData {
    stations: Vec<StationInfo>,
}

#[derive(Deserialize, Debug)]
struct StationStatusData {
    stations: Vec<StationStatus>,
}

#[derive(Deserialize, Debug)]
struct FreeBikeStatusData {
    bikes: Vec<BikeStatus>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StationInfo {
    pub station_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub short_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub station_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub external_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub lat: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub lon: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub capacity: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub has_kiosk: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub electric_bike_surcharge_waiver: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StationStatus {
    pub station_id: String,
    #[serde(default, deserialize_with = "flag")]
    pub is_installed: i64,
    #[serde(default, deserialize_with = "flag")]
    pub is_renting: i64,
    #[serde(default, deserialize_with = "flag")]
    pub is_returning: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub last_reported: i64,
    #[serde(default, rename = "num_bikes_available", deserialize_with = "nullable")]
    pub bikes_available: i64,
    #[serde(default, rename = "num_bikes_disabled", deserialize_with = "nullable")]
    pub bikes_disabled: i64,
    #[serde(default, rename = "num_docks_available", deserialize_with = "nullable")]
    pub docks_available: i64,
    #[serde(default, rename = "num_docks_disabled", deserialize_with = "nullable")]
    pub docks_disabled: i64,
    #[serde(default, rename = "num_ebikes_available", deserialize_with = "nullable")]
    pub ebikes_available: i64,
    #[serde(default, rename = "num_scooters_available", deserialize_with = "nullable")]
    pub scooters_available: i64,
    #[serde(default, rename = "num_scooters_unavailable", deserialize_with = "nullable")]
    pub scooters_unavailable: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BikeStatus {
    pub bike_id: String,
    #[serde(default, deserialize_with = "flag")]
    pub is_disabled: i64,
    #[serde(default, deserialize_with = "flag")]
    pub is_reserved: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub lat: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub lon: f64,
}
