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

//! Test doubles of the daemon collaborators.

use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use colibri_proto::{address::IsdAsn, colibri::StitchableSegments};
use prometheus::Registry;

use super::{Collaborators, DaemonServer};
use crate::{
    config::DaemonConfig,
    fetcher::{
        AsInspector, CollaboratorError, PathFetchError, PathFetcher, ReservationClient,
        SegmentFetchError, SegmentSource, Topology,
    },
    metrics::DaemonMetrics,
    path::Path,
    reservation::{
        AddAdmissionEntryResponse, AdmissionEntry, CleanupRsvRequest, CleanupRsvResponse,
        SetupRsvRequest, SetupRsvResponse,
    },
    types::ResFut,
};

pub const LOCAL_IA: &str = "1-ff00:0:111";
pub const CORE_IA: &str = "1-ff00:0:110";
pub const UNKNOWN_IA: &str = "3-ff00:0:330";

pub fn local_ia() -> IsdAsn {
    LOCAL_IA.parse().unwrap()
}

pub fn next_hop(ifid: u16) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, ifid as u8], 30041))
}

pub fn control_addr() -> SocketAddr {
    SocketAddr::from(([10, 0, 0, 100], 30252))
}

pub fn test_paths(n: u8) -> Vec<Path> {
    (0..n)
        .map(|i| {
            let mut path = Path::new(
                local_ia(),
                "2-ff00:0:220".parse().unwrap(),
                Bytes::from(vec![i; 8]),
                DateTime::<Utc>::UNIX_EPOCH,
            );
            path.mtu = 1472;
            path.underlay_next_hop = Some(next_hop(1));
            path
        })
        .collect()
}

type Behavior = (Duration, Result<Vec<Path>, String>);

/// Path fetcher answering the n-th call with the n-th behavior, repeating the last one.
pub struct MockFetcher {
    behaviors: Vec<Behavior>,
    calls: AtomicUsize,
    completed: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new(behaviors: Vec<Behavior>) -> Arc<Self> {
        assert!(!behaviors.is_empty());
        Arc::new(MockFetcher {
            behaviors,
            calls: AtomicUsize::new(0),
            completed: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn idle() -> Arc<Self> {
        Self::new(vec![(Duration::ZERO, Ok(Vec::new()))])
    }

    /// Number of fetches started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of fetches that ran to completion.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl PathFetcher for MockFetcher {
    fn fetch_paths(
        &self,
        _src: IsdAsn,
        _dst: IsdAsn,
        _refresh: bool,
    ) -> impl ResFut<'_, Vec<Path>, PathFetchError> {
        // Counted when the fetch is started, not when it is first polled.
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, outcome) = self.behaviors[call.min(self.behaviors.len() - 1)].clone();
        let completed = self.completed.clone();
        async move {
            tokio::time::sleep(delay).await;
            completed.fetch_add(1, Ordering::SeqCst);
            outcome.map_err(PathFetchError::Upstream)
        }
    }
}

#[derive(Default)]
pub struct MockSegmentSource {
    pub segments: Option<StitchableSegments>,
    pub requests: Mutex<Vec<(IsdAsn, IsdAsn)>>,
}

#[async_trait::async_trait]
impl SegmentSource for MockSegmentSource {
    async fn stitchable_segments(
        &self,
        src: IsdAsn,
        dst: IsdAsn,
    ) -> Result<StitchableSegments, SegmentFetchError> {
        self.requests.lock().unwrap().push((src, dst));
        self.segments
            .clone()
            .ok_or_else(|| "no segment reservations".into())
    }
}

pub struct MockReservationClient {
    pub setup: Result<SetupRsvResponse, String>,
    pub setup_requests: Mutex<Vec<SetupRsvRequest>>,
    pub cleanup_requests: Mutex<Vec<CleanupRsvRequest>>,
}

impl MockReservationClient {
    pub fn new(setup: Result<SetupRsvResponse, String>) -> Arc<Self> {
        Arc::new(MockReservationClient {
            setup,
            setup_requests: Mutex::new(Vec::new()),
            cleanup_requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl ReservationClient for MockReservationClient {
    async fn setup_reservation(
        &self,
        req: SetupRsvRequest,
    ) -> Result<SetupRsvResponse, CollaboratorError> {
        self.setup_requests.lock().unwrap().push(req);
        self.setup.clone().map_err(Into::into)
    }

    async fn cleanup_reservation(
        &self,
        req: CleanupRsvRequest,
    ) -> Result<CleanupRsvResponse, CollaboratorError> {
        self.cleanup_requests.lock().unwrap().push(req);
        Ok(CleanupRsvResponse::Success)
    }

    async fn add_admission_entry(
        &self,
        entry: AdmissionEntry,
    ) -> Result<AddAdmissionEntryResponse, CollaboratorError> {
        Ok(AddAdmissionEntryResponse {
            valid_until: entry.valid_until,
        })
    }
}

/// Interfaces 1 to 3, of which 3 has no underlay address.
pub struct MockTopology;

impl Topology for MockTopology {
    fn interface_ids(&self) -> Vec<u16> {
        vec![3, 1, 2]
    }

    fn underlay_next_hop(&self, ifid: u16) -> Option<SocketAddr> {
        matches!(ifid, 1 | 2).then(|| next_hop(ifid))
    }

    fn control_service_addresses(&self) -> Vec<SocketAddr> {
        vec![control_addr()]
    }
}

/// Knows the local AS and [CORE_IA], fails for anything else.
pub struct MockInspector;

#[async_trait::async_trait]
impl AsInspector for MockInspector {
    async fn is_core(&self, ia: IsdAsn) -> Result<bool, CollaboratorError> {
        if ia == local_ia() {
            Ok(false)
        } else if ia == CORE_IA.parse::<IsdAsn>()? {
            Ok(true)
        } else {
            Err(format!("no TRC for {ia}").into())
        }
    }
}

pub fn collaborators(
    segments: Arc<MockSegmentSource>,
    reservations: Arc<MockReservationClient>,
) -> Collaborators {
    Collaborators {
        segments,
        reservations,
        topology: Arc::new(MockTopology),
        inspector: Arc::new(MockInspector),
    }
}

pub fn server_with(
    fetcher: Arc<MockFetcher>,
    collaborators: Collaborators,
) -> DaemonServer<MockFetcher> {
    let config = DaemonConfig {
        isd_as: local_ia(),
        ..Default::default()
    };
    let metrics = DaemonMetrics::new(&Registry::new()).unwrap();
    DaemonServer::new(config, metrics, fetcher, collaborators)
}

pub fn server(fetcher: Arc<MockFetcher>) -> DaemonServer<MockFetcher> {
    server_with(
        fetcher,
        collaborators(
            Arc::new(MockSegmentSource::default()),
            MockReservationClient::new(Err("unused".to_string())),
        ),
    )
}
