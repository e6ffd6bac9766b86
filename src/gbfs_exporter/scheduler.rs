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

use crate::sampler::{PassSummary, Sampler};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, Level};

/// A single sampling pass over every feed, run by the `Scheduler`.
pub trait SamplingPass {
    fn run_pass(&self) -> impl Future<Output = PassSummary> + Send;
}

impl SamplingPass for Sampler {
    fn run_pass(&self) -> impl Future<Output = PassSummary> + Send {
        self.sample()
    }
}

/// Runs sampling passes on a fixed period.
///
/// Passes run one at a time from a single task. If a pass takes longer than the period,
/// ticks missed in the meantime are skipped rather than run back to back.
#[derive(Debug)]
pub struct Scheduler<P> {
    sampler: P,
    period: Duration,
}

impl<P: SamplingPass> Scheduler<P> {
    /// Create a new `Scheduler`.
    ///
    /// # Panics
    ///
    /// If `period` is zero.
    pub fn new(sampler: P, period: Duration) -> Self {
        assert!(!period.is_zero(), "sampling period must be non-zero");
        Scheduler { sampler, period }
    }

    /// Run a single pass immediately, used before the metrics endpoint starts serving
    /// so that the first scrape is never empty.
    pub async fn startup(&self) -> PassSummary {
        self.pass().await
    }

    /// Run a pass every period, forever. The first pass runs one period after this
    /// is called.
    pub async fn run(self) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(message = "feed polling started", period_secs = self.period.as_secs_f64());

        loop {
            let _ = interval.tick().await;
            self.pass().await;
        }
    }

    async fn pass(&self) -> PassSummary {
        self.sampler
            .run_pass()
            .instrument(tracing::span!(Level::DEBUG, "gbfs_sample"))
            .await
    }
}
