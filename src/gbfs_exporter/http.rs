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

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const TEXT_FORMAT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// State shared by all requests to the metrics endpoint.
#[derive(Debug)]
pub struct RequestContext {
    registry: Registry,
}

impl RequestContext {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }
}

/// Router exposing all metrics in `context` at `/metrics` in the text exposition format.
pub fn app(context: Arc<RequestContext>) -> Router {
    Router::new()
        .route("/metrics", get(text_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

async fn text_metrics(State(context): State<Arc<RequestContext>>) -> Response {
    let mut buf = String::new();

    match encode(&mut buf, &context.registry) {
        Ok(_) => {
            tracing::debug!(message = "encoded prometheus metrics to text format", num_bytes = buf.len());
            ([(CONTENT_TYPE, TEXT_FORMAT)], buf).into_response()
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics", error = %e);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

#[cfg(test)]
mod test {
    use super::{app, RequestContext, TEXT_FORMAT};
    use crate::client::{BikeStatus, Feed};
    use crate::metrics::BikeshareMetrics;
    use axum::Server;
    use prometheus_client::registry::Registry;
    use reqwest::header::CONTENT_TYPE;
    use reqwest::{Client, StatusCode};
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    async fn serve() -> (BikeshareMetrics, String) {
        let mut reg = Registry::default();
        let metrics = BikeshareMetrics::new(&mut reg);
        let context = Arc::new(RequestContext::new(reg));

        let addr: SocketAddr = (Ipv4Addr::LOCALHOST, 0).into();
        let server = Server::bind(&addr).serve(app(context).into_make_service());
        let local_addr = server.local_addr();
        tokio::spawn(server);

        (metrics, format!("http://{}", local_addr))
    }

    #[tokio::test]
    async fn test_metrics() {
        let (metrics, base) = serve().await;
        metrics.bike_status(&BikeStatus {
            bike_id: "abc".to_owned(),
            is_disabled: 1,
            is_reserved: 0,
            lat: 0.0,
            lon: 0.0,
        });

        let res = Client::new().get(format!("{}/metrics", base)).send().await.unwrap();
        assert_eq!(StatusCode::OK, res.status());
        assert_eq!(TEXT_FORMAT, res.headers()[CONTENT_TYPE].to_str().unwrap());

        let body = res.text().await.unwrap();
        assert!(body.contains("# TYPE bike_disabled gauge"));
        assert!(body.contains(r#"bike_disabled{bike_id="abc"} 1"#));
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let (_metrics, base) = serve().await;
        let res = Client::new().post(format!("{}/metrics", base)).send().await.unwrap();
        assert_eq!(StatusCode::METHOD_NOT_ALLOWED, res.status());
    }

    #[tokio::test]
    async fn test_not_found() {
        let (_metrics, base) = serve().await;
        let res = Client::new()
            .get(format!("{}/{}", base, Feed::StationStatus.file_name()))
            .send()
            .await
            .unwrap();
        assert_eq!(StatusCode::NOT_FOUND, res.status());
    }
}
