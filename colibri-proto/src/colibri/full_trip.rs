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

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::looks::ReservationLooks;
use crate::{address::IsdAsn, reservation::ReservationId};

/// One concrete sequence of segment reservations leading from a source to a destination AS.
///
/// The segments are shared with the [StitchableSegments](super::StitchableSegments) they were
/// stitched from. Consecutive segments are connected: the destination of one is the source of
/// the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FullTrip(Vec<Arc<ReservationLooks>>);

impl FullTrip {
    /// Creates a trip from the given segments.
    pub fn new(segments: Vec<Arc<ReservationLooks>>) -> Self {
        FullTrip(segments)
    }

    /// Segments of the trip, in traversal order.
    pub fn segments(&self) -> &[Arc<ReservationLooks>] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the trip has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bottleneck bandwidth of the trip in kbps.
    ///
    /// This is the minimum over all segments of the allocated bandwidth scaled by the segment's
    /// split for data. An empty trip has no bandwidth.
    pub fn bw(&self) -> u64 {
        self.0
            .iter()
            .map(|l| l.data_bw_kbps())
            .min()
            .unwrap_or(0)
    }

    /// First AS of the trip.
    pub fn src_ia(&self) -> Option<IsdAsn> {
        self.0.first().map(|l| l.src_ia)
    }

    /// Last AS of the trip.
    pub fn dst_ia(&self) -> Option<IsdAsn> {
        self.0.last().map(|l| l.dst_ia)
    }

    /// IDs of the segments, in traversal order.
    pub fn segment_ids(&self) -> Vec<ReservationId> {
        self.0.iter().map(|l| l.id).collect()
    }

    /// Earliest expiration among the segments.
    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.0.iter().map(|l| l.expiration_time).min()
    }

    /// Returns true if every segment starts where the previous one ends.
    pub fn is_connected(&self) -> bool {
        self.0.windows(2).all(|w| w[0].dst_ia == w[1].src_ia)
    }
}

impl From<Vec<Arc<ReservationLooks>>> for FullTrip {
    fn from(segments: Vec<Arc<ReservationLooks>>) -> Self {
        FullTrip(segments)
    }
}

impl fmt::Display for FullTrip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(src) = self.src_ia() else {
            return write!(f, "<empty>");
        };
        write!(f, "{src}")?;
        for l in &self.0 {
            write!(f, ">{}", l.dst_ia)?;
        }
        Ok(())
    }
}
