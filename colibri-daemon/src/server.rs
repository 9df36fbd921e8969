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

//! The daemon server.
//!
//! [DaemonServer] implements the handlers of the daemon API as plain async methods. A
//! transport layer decodes requests, calls the handler and encodes the result.
//!
//! ## Path requests
//!
//! Concurrent identical path requests are coalesced into a single upstream fetch. A request
//! whose deadline is close additionally triggers a background fetch with its own, longer
//! timeout. If the foreground fetch times out, the background fetch can still complete and
//! warm the fetcher's cache for the next request.

mod colibri;
#[cfg(test)]
mod mocks;

use std::{
    collections::{BTreeMap, HashMap},
    net::SocketAddr,
    sync::Arc,
};

use colibri_proto::{
    address::IsdAsn,
    colibri::StitchableSegmentsError,
};
use tokio::time::Instant;
use tracing::{Instrument, instrument};

use crate::{
    config::DaemonConfig,
    dedupe::{Call, Group},
    fetcher::{
        AsInspector, CollaboratorError, PathFetchError, PathFetcher, ReservationClient,
        SegmentFetchError, SegmentSource, Topology,
    },
    metrics::{DaemonMetrics, RequestResult},
    path::Path,
};

type PathGroup = Group<Vec<Path>, PathFetchError>;

/// Errors of the daemon handlers other than paths.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// The AS inspector failed.
    #[error("inspecting ISD-AS {ia}: {source}")]
    Inspect {
        /// Inspected AS.
        ia: IsdAsn,
        /// Underlying error.
        source: CollaboratorError,
    },
    /// The segment reservations could not be fetched.
    #[error("fetching segment reservations: {0}")]
    SegmentFetch(#[source] SegmentFetchError),
    /// The fetched segment reservations are malformed.
    #[error("invalid segment reservations: {0}")]
    InvalidSegments(#[from] StitchableSegmentsError),
    /// The COLIBRI service failed.
    #[error("reservation service: {0}")]
    Reservation(#[source] CollaboratorError),
    /// The next hop of a setup response is not an interface ID.
    #[error("obtaining next hop from egress {0:?}")]
    InvalidNextHop(String),
    /// The next hop of a setup response is an unknown interface.
    #[error("obtaining next hop from egress id, egress {0} not present")]
    UnknownEgress(u16),
}

/// A paths request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathsRequest {
    /// Source AS.
    pub src: IsdAsn,
    /// Destination AS.
    pub dst: IsdAsn,
    /// Bypass caches of the fetcher.
    pub refresh: bool,
}

/// Information about an AS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsInfo {
    /// The AS.
    pub isd_as: IsdAsn,
    /// Whether the AS is a core AS.
    pub core: bool,
    /// MTU, known only for the local AS.
    pub mtu: Option<u16>,
}

/// Collaborators of the daemon besides the path fetcher.
#[derive(Clone)]
pub struct Collaborators {
    /// Source of segment reservations.
    pub segments: Arc<dyn SegmentSource>,
    /// Client of the COLIBRI service.
    pub reservations: Arc<dyn ReservationClient>,
    /// Local topology.
    pub topology: Arc<dyn Topology>,
    /// AS inspector.
    pub inspector: Arc<dyn AsInspector>,
}

/// The daemon server.
pub struct DaemonServer<F: PathFetcher> {
    config: DaemonConfig,
    metrics: DaemonMetrics,
    fetcher: Arc<F>,
    segments: Arc<dyn SegmentSource>,
    reservations: Arc<dyn ReservationClient>,
    topology: Arc<dyn Topology>,
    inspector: Arc<dyn AsInspector>,
    foreground_path_dedupe: PathGroup,
    background_path_dedupe: PathGroup,
}

impl<F: PathFetcher> DaemonServer<F> {
    /// Creates a new server.
    pub fn new(
        config: DaemonConfig,
        metrics: DaemonMetrics,
        fetcher: Arc<F>,
        collaborators: Collaborators,
    ) -> Self {
        DaemonServer {
            config,
            metrics,
            fetcher,
            segments: collaborators.segments,
            reservations: collaborators.reservations,
            topology: collaborators.topology,
            inspector: collaborators.inspector,
            foreground_path_dedupe: Group::new(),
            background_path_dedupe: Group::new(),
        }
    }

    /// The server configuration.
    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// The server metrics.
    pub fn metrics(&self) -> &DaemonMetrics {
        &self.metrics
    }

    /// Local ISD-AS.
    pub fn local_ia(&self) -> IsdAsn {
        self.config.isd_as
    }

    /// Returns the paths from `req.src` to `req.dst`.
    ///
    /// Without a deadline the configured default timeout applies. Errors are shared with all
    /// coalesced callers and returned unchanged.
    #[instrument(name = "paths", skip_all, fields(src = %req.src, dst = %req.dst, refresh = req.refresh))]
    pub async fn paths(
        &self,
        req: PathsRequest,
        deadline: Option<Instant>,
    ) -> Result<Vec<Path>, Arc<PathFetchError>> {
        let start = Instant::now();
        let res = self.paths_inner(req, deadline).await;
        let dst_isd = req.dst.isd().to_string();
        self.metrics.paths.observe(
            &[RequestResult::of_paths(&res).as_str(), dst_isd.as_str()],
            start.elapsed(),
        );
        res
    }

    async fn paths_inner(
        &self,
        req: PathsRequest,
        deadline: Option<Instant>,
    ) -> Result<Vec<Path>, Arc<PathFetchError>> {
        let now = Instant::now();
        let deadline = deadline.unwrap_or(now + self.config.default_paths_timeout);

        // Registered before the background fetch so that the caller's fetch is the first to
        // reach the fetcher.
        let (call, shared) =
            start_path_fetch(&self.fetcher, &self.foreground_path_dedupe, req, deadline);

        if deadline.saturating_duration_since(now) <= self.config.background_refresh_window {
            self.spawn_background_paths(req);
        }

        // The fetch itself is bounded by the deadline of the caller that started it. A joining
        // caller bounds only its own wait.
        let res = if shared {
            match tokio::time::timeout_at(deadline, call).await {
                Ok(res) => res,
                Err(_) => Err(Arc::new(PathFetchError::Timeout)),
            }
        } else {
            call.await
        };
        match &res {
            Ok(paths) => {
                tracing::trace!(n_paths = paths.len(), shared, "Fetched paths");
            }
            Err(e) => {
                tracing::debug!(error = %e, shared, "Fetching paths failed");
            }
        }
        res
    }

    fn spawn_background_paths(&self, req: PathsRequest) {
        let span = tracing::info_span!(
            parent: None,
            "fetch.paths.background",
            src = %req.src,
            dst = %req.dst,
            refresh = req.refresh
        );
        span.follows_from(&tracing::Span::current());

        let deadline = Instant::now() + self.config.background_timeout;
        let (call, _) = span.in_scope(|| {
            start_path_fetch(&self.fetcher, &self.background_path_dedupe, req, deadline)
        });

        let counter = self.metrics.background_path_fetches.clone();
        tokio::spawn(
            async move {
                let res = call.await;
                counter
                    .with_label_values(&[RequestResult::of_paths(&res).as_str()])
                    .inc();
                if let Err(e) = res {
                    tracing::debug!(error = %e, "Fetching paths in background failed");
                }
            }
            .instrument(span),
        );
    }

    /// Returns information about an AS. The zero ISD-AS stands for the local AS.
    #[instrument(name = "as", skip(self))]
    pub async fn as_info(&self, ia: IsdAsn) -> Result<AsInfo, DaemonError> {
        let start = Instant::now();
        let res = self.as_info_inner(ia).await;
        self.metrics
            .as_info
            .observe(&[RequestResult::of(&res).as_str()], start.elapsed());
        res
    }

    async fn as_info_inner(&self, ia: IsdAsn) -> Result<AsInfo, DaemonError> {
        let ia = if ia.is_zero() { self.local_ia() } else { ia };
        let core = self.inspector.is_core(ia).await.map_err(|e| {
            tracing::error!(error = %e, %ia, "Inspecting ISD-AS failed");
            DaemonError::Inspect { ia, source: e }
        })?;
        let mtu = (ia == self.local_ia()).then_some(self.config.mtu);
        Ok(AsInfo {
            isd_as: ia,
            core,
            mtu,
        })
    }

    /// Returns the underlay address of every local interface that has one.
    pub fn interfaces(&self) -> BTreeMap<u16, SocketAddr> {
        let start = Instant::now();
        let interfaces = self
            .topology
            .interface_ids()
            .into_iter()
            .filter_map(|ifid| Some((ifid, self.topology.underlay_next_hop(ifid)?)))
            .collect();
        self.metrics
            .interfaces
            .observe(&[RequestResult::OkSuccess.as_str()], start.elapsed());
        interfaces
    }

    /// Returns the addresses of the local services, keyed by service name.
    pub fn services(&self) -> HashMap<String, Vec<SocketAddr>> {
        let start = Instant::now();
        let services = HashMap::from([(
            "control".to_string(),
            self.topology.control_service_addresses(),
        )]);
        self.metrics
            .services
            .observe(&[RequestResult::OkSuccess.as_str()], start.elapsed());
        services
    }
}

/// Registers a path fetch bounded by `deadline` in `group`.
fn start_path_fetch<F: PathFetcher>(
    fetcher: &Arc<F>,
    group: &PathGroup,
    req: PathsRequest,
    deadline: Instant,
) -> (Call<Vec<Path>, PathFetchError>, bool) {
    let key = format!("{}{}{}", req.src, req.dst, req.refresh);
    group.start(key, || {
        let fetcher = fetcher.clone();
        async move {
            let fetch = fetcher.fetch_paths(req.src, req.dst, req.refresh);
            match tokio::time::timeout_at(deadline, fetch).await {
                Ok(res) => res,
                Err(_) => Err(PathFetchError::Timeout),
            }
        }
    })
}
