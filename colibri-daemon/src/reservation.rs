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

//! Requests and responses of the COLIBRI end-to-end reservation handlers.
//!
//! The daemon forwards these to the local COLIBRI service. Only the setup response is touched
//! on the way back: its next hop is rewritten from an egress interface ID to an underlay
//! address.

use std::net::IpAddr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use colibri_proto::{
    address::IsdAsn,
    reservation::{BwCls, ReservationId},
};

/// Request to set up or renew an E2E reservation over a list of segment reservations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupRsvRequest {
    /// E2E reservation ID.
    pub id: ReservationId,
    /// Source AS.
    pub src_ia: IsdAsn,
    /// Destination AS.
    pub dst_ia: IsdAsn,
    /// Destination host.
    pub dst_host: IpAddr,
    /// Reservation index.
    pub index: u8,
    /// Requested bandwidth.
    pub requested_bw: BwCls,
    /// Segment reservations to stitch, in traversal order.
    pub segments: Vec<ReservationId>,
}

/// Outcome of an E2E setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupRsvResponse {
    /// The reservation was admitted along the whole path.
    Success(SetupSuccess),
    /// Some AS on the path refused the reservation.
    Failure(SetupFailure),
}

/// Successful E2E setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupSuccess {
    /// Raw COLIBRI path to use for the reservation.
    pub raw_path: Bytes,
    /// First hop. Reported as the egress interface ID by the COLIBRI service and rewritten to
    /// the underlay address of that interface by the daemon.
    pub next_hop: String,
}

/// Failed E2E setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupFailure {
    /// Error message.
    pub message: String,
    /// Index of the AS that failed the request.
    pub failed_step: usize,
    /// Bandwidth granted by each AS up to the failure.
    pub alloc_trail: Vec<BwCls>,
}

/// Request to remove an E2E reservation index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupRsvRequest {
    /// E2E reservation ID.
    pub id: ReservationId,
    /// Reservation index.
    pub index: u8,
}

/// Outcome of an E2E cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupRsvResponse {
    /// The index was removed.
    Success,
    /// Some AS on the path failed the request.
    Failure {
        /// Error message.
        message: String,
        /// Index of the AS that failed the request.
        failed_step: usize,
    },
}

/// Admission entry for E2E reservations towards a local host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionEntry {
    /// Host the entry applies to.
    pub dst_host: IpAddr,
    /// Requested validity.
    pub valid_until: DateTime<Utc>,
    /// Regular expression matched against the source AS.
    pub regexp_ia: String,
    /// Regular expression matched against the source host.
    pub regexp_host: String,
    /// Whether matching requests are admitted or rejected.
    pub accept: bool,
}

/// Result of adding an admission entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddAdmissionEntryResponse {
    /// Validity actually granted.
    pub valid_until: DateTime<Utc>,
}
