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

//! External collaborators of the daemon.
//!
//! The daemon does not fetch path segments, talk to the COLIBRI service or load the topology
//! itself. It is handed implementations of the traits in this module.

use std::{borrow::Cow, net::SocketAddr};

use colibri_proto::{address::IsdAsn, colibri::StitchableSegments};
use tokio::task::JoinError;

use crate::{
    path::Path,
    reservation::{
        AddAdmissionEntryResponse, AdmissionEntry, CleanupRsvRequest, CleanupRsvResponse,
        SetupRsvRequest, SetupRsvResponse,
    },
    types::ResFut,
};

/// Path fetcher trait.
pub trait PathFetcher: Send + Sync + 'static {
    /// Fetch paths between source and destination ISD-AS.
    ///
    /// With `refresh` set, cached paths must not be used.
    fn fetch_paths(
        &self,
        src: IsdAsn,
        dst: IsdAsn,
        refresh: bool,
    ) -> impl ResFut<'_, Vec<Path>, PathFetchError>;
}

/// Path fetch errors.
#[derive(Debug, thiserror::Error)]
pub enum PathFetchError {
    /// No paths found.
    #[error("no paths found")]
    NoPathsFound,

    /// The fetch did not complete before its deadline.
    #[error("path fetch timed out")]
    Timeout,

    /// The upstream path service failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Non network related internal error.
    #[error("internal error: {0}")]
    InternalError(Cow<'static, str>),

    /// The fetch task panicked or was cancelled.
    #[error("path fetch task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

/// Boxed error of an external collaborator.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Segment fetch error.
pub type SegmentFetchError = CollaboratorError;

/// Source of segment reservations, usually the local COLIBRI service.
#[async_trait::async_trait]
pub trait SegmentSource: Send + Sync + 'static {
    /// Lists the segment reservations from which E2E reservations from `src` to `dst` can be
    /// stitched.
    async fn stitchable_segments(
        &self,
        src: IsdAsn,
        dst: IsdAsn,
    ) -> Result<StitchableSegments, SegmentFetchError>;
}

/// Client of the local COLIBRI service for E2E reservations.
#[async_trait::async_trait]
pub trait ReservationClient: Send + Sync + 'static {
    /// Sets up or renews an E2E reservation.
    async fn setup_reservation(
        &self,
        req: SetupRsvRequest,
    ) -> Result<SetupRsvResponse, CollaboratorError>;

    /// Removes an E2E reservation index.
    async fn cleanup_reservation(
        &self,
        req: CleanupRsvRequest,
    ) -> Result<CleanupRsvResponse, CollaboratorError>;

    /// Adds an admission entry for a local host.
    async fn add_admission_entry(
        &self,
        entry: AdmissionEntry,
    ) -> Result<AddAdmissionEntryResponse, CollaboratorError>;
}

/// View of the local AS topology.
pub trait Topology: Send + Sync + 'static {
    /// IDs of all interfaces of the local AS.
    fn interface_ids(&self) -> Vec<u16>;

    /// Underlay address of the border router owning the interface.
    fn underlay_next_hop(&self, ifid: u16) -> Option<SocketAddr>;

    /// Addresses of the control service.
    fn control_service_addresses(&self) -> Vec<SocketAddr>;
}

/// Source of information about remote ASes, usually the trust store.
#[async_trait::async_trait]
pub trait AsInspector: Send + Sync + 'static {
    /// Returns true if the AS is a core AS.
    async fn is_core(&self, ia: IsdAsn) -> Result<bool, CollaboratorError>;
}
