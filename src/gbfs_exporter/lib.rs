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

//! Prometheus metrics exporter for GBFS bikeshare feeds
//!
//! ## Features
//!
//! `gbfs_exporter` polls the [GBFS] feeds of a bikeshare system (by default [Bay Wheels]) and
//! emits the state of each station and free-floating bike as Prometheus gauges. Every pass
//! fetches `station_information.json`, `station_status.json`, and `free_bike_status.json`
//! from the feed base URL, in that order. The following metrics are emitted.
//!
//! * `station_capacity{station_id=$ID, name=$NAME}` - Docking capacity of the station.
//! * `station_last_report{station_id=$ID, name=$NAME}` - Last status report, as a UNIX timestamp.
//! * `station_is_installed{station_id=$ID, name=$NAME}` - 1 if the station is installed, 0 otherwise.
//! * `station_is_renting{station_id=$ID, name=$NAME}` - 1 if the station is renting bikes, 0 otherwise.
//! * `station_is_returning{station_id=$ID, name=$NAME}` - 1 if the station accepts returns, 0 otherwise.
//! * `station_bikes_available{station_id=$ID, name=$NAME}` - Bikes available at the station.
//! * `station_bikes_disabled{station_id=$ID, name=$NAME}` - Disabled bikes at the station.
//! * `station_docks_available{station_id=$ID, name=$NAME}` - Docks available at the station.
//! * `station_docks_disabled{station_id=$ID, name=$NAME}` - Disabled docks at the station.
//! * `station_ebikes_available{station_id=$ID, name=$NAME}` - E-bikes available at the station.
//! * `bike_disabled{bike_id=$ID}` - 1 if the free-floating bike is disabled, 0 otherwise.
//! * `bike_reserved{bike_id=$ID}` - 1 if the free-floating bike is reserved, 0 otherwise.
//!
//! Station names come from the station information feed fetched in the same pass. If it
//! can't be fetched, station status metrics are labeled with the name `unknown`.
//!
//! If a feed can't be fetched or decoded, metrics from that feed keep the values they were
//! last set to. Stations and bikes that stop being reported are never removed.
//!
//! [GBFS]: https://github.com/MobilityData/gbfs
//! [Bay Wheels]: https://www.lyft.com/bikes/bay-wheels
//!
//! ## Build
//!
//! `gbfs_exporter` is a Rust program and must be built from source using a [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! git clone git@github.com:56quarters/gbfs_exporter.git && cd gbfs_exporter
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! By default, `gbfs_exporter` samples the Bay Wheels feeds every 60 seconds. Other systems
//! can be used by pointing it at the base URL of their feeds.
//!
//! ```text
//! ./gbfs_exporter --api-url https://gbfs.citibikenyc.com/gbfs/en
//! ```
//!
//! ### Prometheus
//!
//! Prometheus metrics are exposed on port `9100` at `/metrics`. Add the host running
//! `gbfs_exporter` as a target under the Prometheus `scrape_configs` section.
//!
//! ```yaml
//! scrape_configs:
//! - job_name: gbfs_exporter
//!   static_configs:
//!   - targets: ['example:9100']
//! ```
//!

pub mod client;
pub mod http;
pub mod metrics;
pub mod sampler;
pub mod scheduler;

#[cfg(test)]
mod testing;
