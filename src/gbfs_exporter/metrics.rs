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

use crate::client::{BikeStatus, StationInfo, StationStatus};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;

type FloatGauge = Gauge<f64, AtomicU64>;

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StationLabels {
    pub station_id: String,
    pub name: String,
}

impl StationLabels {
    pub fn new(station_id: &str, name: &str) -> Self {
        StationLabels {
            station_id: station_id.to_owned(),
            name: name.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct BikeLabels {
    pub bike_id: String,
}

/// Holder for gauges set from the station information, station status, and free bike
/// status feeds.
///
/// All metrics are created and registered upon call to `BikeshareMetrics::new()`. Station
/// metrics are labeled with the station ID and name, free bike metrics with the bike ID.
/// Series are only created the first time they are set and are never removed, so a
/// station or bike that disappears from a feed keeps exporting its last value.
#[derive(Debug)]
pub struct BikeshareMetrics {
    station_capacity: Family<StationLabels, FloatGauge>,
    bike_disabled: Family<BikeLabels, FloatGauge>,
    bike_reserved: Family<BikeLabels, FloatGauge>,
    station_last_report: Family<StationLabels, FloatGauge>,
    station_is_returning: Family<StationLabels, FloatGauge>,
    station_is_renting: Family<StationLabels, FloatGauge>,
    station_is_installed: Family<StationLabels, FloatGauge>,
    station_bikes_available: Family<StationLabels, FloatGauge>,
    station_bikes_disabled: Family<StationLabels, FloatGauge>,
    station_docks_available: Family<StationLabels, FloatGauge>,
    station_docks_disabled: Family<StationLabels, FloatGauge>,
    station_ebikes_available: Family<StationLabels, FloatGauge>,
}

impl BikeshareMetrics {
    /// Create a new `BikeshareMetrics` and register each metric with the provided `Registry`.
    pub fn new(reg: &mut Registry) -> Self {
        let station_capacity = Family::<StationLabels, FloatGauge>::default();
        let bike_disabled = Family::<BikeLabels, FloatGauge>::default();
        let bike_reserved = Family::<BikeLabels, FloatGauge>::default();
        let station_last_report = Family::<StationLabels, FloatGauge>::default();
        let station_is_returning = Family::<StationLabels, FloatGauge>::default();
        let station_is_renting = Family::<StationLabels, FloatGauge>::default();
        let station_is_installed = Family::<StationLabels, FloatGauge>::default();
        let station_bikes_available = Family::<StationLabels, FloatGauge>::default();
        let station_bikes_disabled = Family::<StationLabels, FloatGauge>::default();
        let station_docks_available = Family::<StationLabels, FloatGauge>::default();
        let station_docks_disabled = Family::<StationLabels, FloatGauge>::default();
        let station_ebikes_available = Family::<StationLabels, FloatGauge>::default();

        reg.register("station_capacity", "Bike capacity of the station", station_capacity.clone());
        reg.register("bike_disabled", "Bike is_disabled status", bike_disabled.clone());
        reg.register("bike_reserved", "Bike is_reserved status", bike_reserved.clone());
        reg.register(
            "station_last_report",
            "Station status report last check-in timestamp",
            station_last_report.clone(),
        );
        reg.register(
            "station_is_returning",
            "Station is_returning status",
            station_is_returning.clone(),
        );
        reg.register("station_is_renting", "Station is_renting status", station_is_renting.clone());
        reg.register(
            "station_is_installed",
            "Station is_installed status",
            station_is_installed.clone(),
        );
        reg.register(
            "station_bikes_available",
            "Number of bikes available at the station",
            station_bikes_available.clone(),
        );
        reg.register(
            "station_bikes_disabled",
            "Number of bikes disabled at the station",
            station_bikes_disabled.clone(),
        );
        reg.register(
            "station_docks_available",
            "Number of docks available at the station",
            station_docks_available.clone(),
        );
        reg.register(
            "station_docks_disabled",
            "Number of docks disabled at the station",
            station_docks_disabled.clone(),
        );
        reg.register(
            "station_ebikes_available",
            "Number of ebikes available at the station",
            station_ebikes_available.clone(),
        );

        Self {
            station_capacity,
            bike_disabled,
            bike_reserved,
            station_last_report,
            station_is_returning,
            station_is_renting,
            station_is_installed,
            station_bikes_available,
            station_bikes_disabled,
            station_docks_available,
            station_docks_disabled,
            station_ebikes_available,
        }
    }

    /// Set the capacity of a station, labeled with its own ID and name.
    pub fn station_information(&self, info: &StationInfo) {
        let labels = StationLabels::new(&info.station_id, &info.name);
        Self::set(&self.station_capacity, &labels, info.capacity);
    }

    /// Set all status metrics of a station using `name` as the station name label.
    pub fn station_status(&self, status: &StationStatus, name: &str) {
        let labels = StationLabels::new(&status.station_id, name);

        Self::set(&self.station_last_report, &labels, status.last_reported);
        Self::set(&self.station_is_returning, &labels, status.is_returning);
        Self::set(&self.station_is_renting, &labels, status.is_renting);
        Self::set(&self.station_is_installed, &labels, status.is_installed);

        // pedal bikes
        Self::set(&self.station_bikes_available, &labels, status.bikes_available);
        Self::set(&self.station_bikes_disabled, &labels, status.bikes_disabled);

        // docks
        Self::set(&self.station_docks_available, &labels, status.docks_available);
        Self::set(&self.station_docks_disabled, &labels, status.docks_disabled);

        // e-bikes
        Self::set(&self.station_ebikes_available, &labels, status.ebikes_available);
    }

    pub fn bike_status(&self, bike: &BikeStatus) {
        let labels = BikeLabels {
            bike_id: bike.bike_id.clone(),
        };

        Self::set(&self.bike_disabled, &labels, bike.is_disabled);
        Self::set(&self.bike_reserved, &labels, bike.is_reserved);
    }

    fn set<L>(family: &Family<L, FloatGauge>, labels: &L, value: i64)
    where
        L: Clone + std::hash::Hash + Eq,
    {
        family.get_or_create(labels).set(value as f64);
    }
}
