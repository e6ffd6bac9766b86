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

use crate::client::{Feed, GbfsClient, StationInfo};
use crate::metrics::BikeshareMetrics;
use std::collections::HashMap;

/// Name used to label station metrics when a station ID isn't in the station information feed.
pub const UNKNOWN_STATION: &str = "unknown";

/// Mapping of station ID to human-readable station name.
///
/// Rebuilt from the station information feed on every pass and never carried
/// between passes.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IdentityMap {
    names: HashMap<String, String>,
}

impl IdentityMap {
    pub fn from_stations(stations: &[StationInfo]) -> Self {
        let names = stations
            .iter()
            .map(|s| (s.station_id.clone(), s.name.clone()))
            .collect();

        IdentityMap { names }
    }

    /// Name of the station or `UNKNOWN_STATION` if the ID wasn't seen this pass.
    pub fn name(&self, station_id: &str) -> &str {
        self.names.get(station_id).map(String::as_str).unwrap_or(UNKNOWN_STATION)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Number of records applied from each feed during a pass, `None` if fetching
/// that feed failed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub stations: Option<usize>,
    pub statuses: Option<usize>,
    pub bikes: Option<usize>,
}

/// Fetches every feed in turn and writes the results to `BikeshareMetrics`.
///
/// A failure fetching one feed never prevents the others from being sampled. Metrics
/// from a failed feed keep whatever value they were last set to.
#[derive(Debug)]
pub struct Sampler {
    client: GbfsClient,
    metrics: BikeshareMetrics,
}

impl Sampler {
    pub fn new(client: GbfsClient, metrics: BikeshareMetrics) -> Self {
        Sampler { client, metrics }
    }

    /// Run a single sampling pass: station information, then station status labeled
    /// using the names just fetched, then free bike status.
    pub async fn sample(&self) -> PassSummary {
        let (names, stations) = self.resolve_identities().await;
        let statuses = self.sample_station_status(&names).await;
        let bikes = self.sample_free_bike_status().await;

        let summary = PassSummary {
            stations,
            statuses,
            bikes,
        };

        tracing::info!(
            message = "sampled feeds",
            stations = ?summary.stations,
            statuses = ?summary.statuses,
            bikes = ?summary.bikes,
        );

        summary
    }

    /// Fetch station information, set the capacity of each station, and build the
    /// ID to name mapping used to label status metrics.
    ///
    /// If the feed can't be fetched, the mapping is empty and capacity metrics are
    /// left untouched.
    pub async fn resolve_identities(&self) -> (IdentityMap, Option<usize>) {
        match self.client.station_information().await {
            Ok(stations) => {
                for station in stations.iter() {
                    self.metrics.station_information(station);
                }

                (IdentityMap::from_stations(&stations), Some(stations.len()))
            }
            Err(e) => {
                tracing::error!(message = "failed to sample feed", feed = %Feed::StationInformation, error = %e);
                (IdentityMap::default(), None)
            }
        }
    }

    pub async fn sample_station_status(&self, names: &IdentityMap) -> Option<usize> {
        match self.client.station_status().await {
            Ok(stations) => {
                let mut unknown = 0;
                for station in stations.iter() {
                    let name = names.name(&station.station_id);
                    if name == UNKNOWN_STATION {
                        unknown += 1;
                    }

                    self.metrics.station_status(station, name);
                }

                if unknown > 0 {
                    tracing::debug!(message = "stations without a known name", count = unknown);
                }

                Some(stations.len())
            }
            Err(e) => {
                tracing::error!(message = "failed to sample feed", feed = %Feed::StationStatus, error = %e);
                None
            }
        }
    }

    pub async fn sample_free_bike_status(&self) -> Option<usize> {
        match self.client.free_bike_status().await {
            Ok(bikes) => {
                for bike in bikes.iter() {
                    self.metrics.bike_status(bike);
                }

                Some(bikes.len())
            }
            Err(e) => {
                tracing::error!(message = "failed to sample feed", feed = %Feed::FreeBikeStatus, error = %e);
                None
            }
        }
    }
}
