// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Prometheus metrics of the daemon handlers.

use std::{sync::Arc, time::Duration};

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

use crate::fetcher::PathFetchError;

const NAMESPACE: &str = "colibri_daemon";

/// Result label of a handled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestResult {
    /// The request succeeded.
    OkSuccess,
    /// The request ran out of time.
    ErrTimeout,
    /// Nothing was found.
    ErrNotFound,
    /// Any other error.
    ErrInternal,
}

impl RequestResult {
    /// Label value.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestResult::OkSuccess => "ok_success",
            RequestResult::ErrTimeout => "err_timeout",
            RequestResult::ErrNotFound => "err_not_found",
            RequestResult::ErrInternal => "err_internal",
        }
    }

    /// Result of a path fetch.
    pub fn of_paths<T>(res: &Result<T, Arc<PathFetchError>>) -> Self {
        let Err(e) = res else {
            return RequestResult::OkSuccess;
        };
        match **e {
            PathFetchError::Timeout => RequestResult::ErrTimeout,
            PathFetchError::NoPathsFound => RequestResult::ErrNotFound,
            _ => RequestResult::ErrInternal,
        }
    }

    /// Result of any other request.
    pub fn of<T, E>(res: &Result<T, E>) -> Self {
        match res {
            Ok(_) => RequestResult::OkSuccess,
            Err(_) => RequestResult::ErrInternal,
        }
    }
}

/// Request counter and latency histogram of one handler.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    requests: IntCounterVec,
    latency: HistogramVec,
}

impl RequestMetrics {
    fn new(
        registry: &Registry,
        handler: &str,
        labels: &[&str],
    ) -> Result<Self, prometheus::Error> {
        let requests = IntCounterVec::new(
            Opts::new(
                format!("{handler}_requests_total"),
                format!("Number of {handler} requests handled by the daemon."),
            )
            .namespace(NAMESPACE),
            labels,
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new(
                format!("{handler}_request_duration_seconds"),
                format!("Time to handle {handler} requests."),
            )
            .namespace(NAMESPACE),
            labels,
        )?;
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        Ok(RequestMetrics { requests, latency })
    }

    /// Records one handled request. `labels` must match the labels the metric was created with.
    pub fn observe(&self, labels: &[&str], elapsed: Duration) {
        self.requests.with_label_values(labels).inc();
        self.latency
            .with_label_values(labels)
            .observe(elapsed.as_secs_f64());
    }

    /// Number of requests recorded with the given labels.
    pub fn count(&self, labels: &[&str]) -> u64 {
        self.requests.with_label_values(labels).get()
    }
}

/// Metrics of the daemon.
#[derive(Debug, Clone)]
pub struct DaemonMetrics {
    /// Paths requests, labelled by result and destination ISD.
    pub paths: RequestMetrics,
    /// AS info requests, labelled by result.
    pub as_info: RequestMetrics,
    /// Interfaces requests, labelled by result.
    pub interfaces: RequestMetrics,
    /// Services requests, labelled by result.
    pub services: RequestMetrics,
    /// COLIBRI requests, labelled by handler and result.
    pub colibri: RequestMetrics,
    /// Background path fetches, labelled by result.
    pub background_path_fetches: IntCounterVec,
}

impl DaemonMetrics {
    /// Creates the metrics and registers them in `registry`.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let background_path_fetches = IntCounterVec::new(
            Opts::new(
                "background_path_fetches_total",
                "Number of background path fetches.",
            )
            .namespace(NAMESPACE),
            &["result"],
        )?;
        registry.register(Box::new(background_path_fetches.clone()))?;

        Ok(DaemonMetrics {
            paths: RequestMetrics::new(registry, "paths", &["result", "dst_isd"])?,
            as_info: RequestMetrics::new(registry, "as", &["result"])?,
            interfaces: RequestMetrics::new(registry, "interfaces", &["result"])?,
            services: RequestMetrics::new(registry, "services", &["result"])?,
            colibri: RequestMetrics::new(registry, "colibri", &["handler", "result"])?,
            background_path_fetches,
        })
    }
}
