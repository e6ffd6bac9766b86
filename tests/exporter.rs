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

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Router, Server};
use gbfs_exporter::client::GbfsClient;
use gbfs_exporter::http::RequestContext;
use gbfs_exporter::metrics::BikeshareMetrics;
use gbfs_exporter::sampler::Sampler;
use gbfs_exporter::scheduler::Scheduler;
use prometheus_client::registry::Registry;
use reqwest::Client;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

const STATION_INFORMATION: &str = r#"{"last_updated":1700000000,"ttl":60,"data":{"stations":[
    {"station_id":"1","name":"Main St","short_name":"MS","station_type":"classic","lat":37.77,"lon":-122.41,
     "external_id":"e1","capacity":15,"has_kiosk":true,"electric_bike_surcharge_waiver":false}
]}}"#;

const FREE_BIKE_STATUS: &str = r#"{"last_updated":1700000000,"ttl":60,"data":{"bikes":[
    {"bike_id":"X","is_disabled":1,"is_reserved":0,"lat":37.7,"lon":-122.4}
]}}"#;

async fn spawn(app: Router) -> SocketAddr {
    let addr: SocketAddr = (Ipv4Addr::LOCALHOST, 0).into();
    let server = Server::bind(&addr).serve(app.into_make_service());
    let local_addr = server.local_addr();
    tokio::spawn(server);
    local_addr
}

/// Publisher with working station information and free bike feeds but a broken status feed.
async fn publisher() -> String {
    let app = Router::new()
        .route("/gbfs/en/station_information.json", get(|| async { STATION_INFORMATION }))
        .route(
            "/gbfs/en/station_status.json",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream broke") }),
        )
        .route("/gbfs/en/free_bike_status.json", get(|| async { FREE_BIKE_STATUS }));

    format!("http://{}/gbfs/en", spawn(app).await)
}

#[tokio::test]
async fn test_first_scrape_reflects_startup_pass() {
    let base_url = publisher().await;
    let mut registry = Registry::default();
    let metrics = BikeshareMetrics::new(&mut registry);
    let client = GbfsClient::new(Client::new(), &base_url).unwrap();
    let scheduler = Scheduler::new(Sampler::new(client, metrics), Duration::from_secs(60));

    let summary = scheduler.startup().await;
    assert_eq!(Some(1), summary.stations);
    assert_eq!(None, summary.statuses);
    assert_eq!(Some(1), summary.bikes);

    tokio::spawn(scheduler.run());
    let context = Arc::new(RequestContext::new(registry));
    let addr = spawn(gbfs_exporter::http::app(context)).await;

    let res = Client::new()
        .get(format!("http://{}/metrics", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(reqwest::StatusCode::OK, res.status());

    let body = res.text().await.unwrap();
    let series: Vec<&str> = body.lines().filter(|l| !l.starts_with('#')).collect();

    assert!(series
        .iter()
        .any(|l| l.starts_with(r#"station_capacity{station_id="1",name="Main St"} 15"#)));
    assert!(series.iter().any(|l| l.starts_with(r#"bike_disabled{bike_id="X"} 1"#)));
    assert!(series.iter().any(|l| l.starts_with(r#"bike_reserved{bike_id="X"} 0"#)));
    assert!(!series.iter().any(|l| l.starts_with("station_bikes_available")));
}
