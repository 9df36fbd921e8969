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

//! COLIBRI handlers of the daemon.

use std::cmp::Reverse;

use colibri_proto::{
    address::IsdAsn,
    colibri::{FullTrip, StitchableSegments},
};
use tokio::time::Instant;
use tracing::instrument;

use super::{DaemonError, DaemonServer};
use crate::{
    fetcher::PathFetcher,
    metrics::RequestResult,
    reservation::{
        AddAdmissionEntryResponse, AdmissionEntry, CleanupRsvRequest, CleanupRsvResponse,
        SetupRsvRequest, SetupRsvResponse,
    },
};

impl<F: PathFetcher> DaemonServer<F> {
    /// Lists the segment reservations usable for E2E reservations from the local AS to `dst`.
    #[instrument(name = "colibri.list_rsvs", skip(self))]
    pub async fn colibri_list_rsvs(&self, dst: IsdAsn) -> Result<StitchableSegments, DaemonError> {
        let start = Instant::now();
        let res = self.list_rsvs(dst).await;
        self.observe_colibri("list_rsvs", &res, start);
        res
    }

    async fn list_rsvs(&self, dst: IsdAsn) -> Result<StitchableSegments, DaemonError> {
        tracing::debug!(%dst, "Fetching reservation list");
        let segments = self
            .segments
            .stitchable_segments(self.local_ia(), dst)
            .await
            .map_err(DaemonError::SegmentFetch)?;
        segments.validate()?;
        Ok(segments)
    }

    /// Lists every trip from the local AS to `dst` that can be stitched from the available
    /// segment reservations, highest bottleneck bandwidth first.
    #[instrument(name = "colibri.trips", skip(self))]
    pub async fn colibri_trips(&self, dst: IsdAsn) -> Result<Vec<FullTrip>, DaemonError> {
        let start = Instant::now();
        let res = self.list_rsvs(dst).await.map(|segments| {
            let mut trips = segments.combine_all();
            trips.sort_by_key(|trip| Reverse(trip.bw()));
            tracing::debug!(n_trips = trips.len(), "Stitched reservation trips");
            trips
        });
        self.observe_colibri("trips", &res, start);
        res
    }

    /// Sets up an E2E reservation through the COLIBRI service.
    ///
    /// The next hop of a successful setup is rewritten from the egress interface ID to the
    /// underlay address of that interface.
    #[instrument(name = "colibri.setup_rsv", skip_all, fields(id = %req.id, dst = %req.dst_ia))]
    pub async fn colibri_setup_rsv(
        &self,
        req: SetupRsvRequest,
    ) -> Result<SetupRsvResponse, DaemonError> {
        let start = Instant::now();
        let res = self.setup_rsv(req).await;
        self.observe_colibri("setup_rsv", &res, start);
        res
    }

    async fn setup_rsv(&self, req: SetupRsvRequest) -> Result<SetupRsvResponse, DaemonError> {
        let mut res = self
            .reservations
            .setup_reservation(req)
            .await
            .map_err(DaemonError::Reservation)?;

        if let SetupRsvResponse::Success(success) = &mut res {
            let egress: u16 = success
                .next_hop
                .parse()
                .map_err(|_| DaemonError::InvalidNextHop(success.next_hop.clone()))?;
            let addr = self
                .topology
                .underlay_next_hop(egress)
                .ok_or(DaemonError::UnknownEgress(egress))?;
            success.next_hop = addr.to_string();
        }
        Ok(res)
    }

    /// Removes an E2E reservation index through the COLIBRI service.
    #[instrument(name = "colibri.cleanup_rsv", skip_all, fields(id = %req.id))]
    pub async fn colibri_cleanup_rsv(
        &self,
        req: CleanupRsvRequest,
    ) -> Result<CleanupRsvResponse, DaemonError> {
        let start = Instant::now();
        let res = self
            .reservations
            .cleanup_reservation(req)
            .await
            .map_err(DaemonError::Reservation);
        self.observe_colibri("cleanup_rsv", &res, start);
        res
    }

    /// Adds an admission entry through the COLIBRI service.
    #[instrument(name = "colibri.add_admission_entry", skip_all, fields(dst_host = %entry.dst_host))]
    pub async fn colibri_add_admission_entry(
        &self,
        entry: AdmissionEntry,
    ) -> Result<AddAdmissionEntryResponse, DaemonError> {
        let start = Instant::now();
        let res = self
            .reservations
            .add_admission_entry(entry)
            .await
            .map_err(DaemonError::Reservation);
        self.observe_colibri("add_admission_entry", &res, start);
        res
    }

    fn observe_colibri<T>(&self, handler: &str, res: &Result<T, DaemonError>, start: Instant) {
        if let Err(e) = res {
            tracing::debug!(error = %e, handler, "COLIBRI request failed");
        }
        self.metrics
            .colibri
            .observe(&[handler, RequestResult::of(res).as_str()], start.elapsed());
    }
}
