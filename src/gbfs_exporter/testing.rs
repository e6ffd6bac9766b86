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

//! In-process stand-in for a GBFS publisher, used by unit tests.

use crate::client::Feed;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Router, Server};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    responses: HashMap<String, (StatusCode, String)>,
    hits: HashMap<String, usize>,
}

/// Serves canned responses per feed. Feeds without a response set return 404.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockFeeds {
    inner: Arc<Mutex<Inner>>,
}

impl MockFeeds {
    pub(crate) fn set(&self, feed: Feed, status: StatusCode, body: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .responses
            .insert(feed.file_name().to_owned(), (status, body.to_owned()));
    }

    pub(crate) fn hits(&self, feed: Feed) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.hits.get(feed.file_name()).copied().unwrap_or(0)
    }

    /// Bind to a random local port and return the base URL of the feeds.
    pub(crate) async fn serve(&self) -> String {
        let app = Router::new()
            .route("/gbfs/en/:file", get(feed_response))
            .with_state(self.clone());

        let addr: SocketAddr = (Ipv4Addr::LOCALHOST, 0).into();
        let server = Server::bind(&addr).serve(app.into_make_service());
        let local_addr = server.local_addr();
        tokio::spawn(server);

        format!("http://{}/gbfs/en", local_addr)
    }
}

async fn feed_response(State(feeds): State<MockFeeds>, Path(file): Path<String>) -> (StatusCode, String) {
    let mut inner = feeds.inner.lock().unwrap();
    *inner.hits.entry(file.clone()).or_insert(0) += 1;
    inner
        .responses
        .get(&file)
        .cloned()
        .unwrap_or((StatusCode::NOT_FOUND, String::new()))
}

/// Parse the text exposition format into a map of series (name and labels) to value.
pub(crate) fn parse_exposition(text: &str) -> HashMap<String, f64> {
    text.lines()
        .filter(|line| !line.starts_with('#') && !line.is_empty())
        .filter_map(|line| {
            let (series, value) = line.rsplit_once(' ')?;
            Some((series.to_owned(), value.parse::<f64>().ok()?))
        })
        .collect()
}
