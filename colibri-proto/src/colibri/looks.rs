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
use serde::{Deserialize, Serialize};

use crate::{
    address::IsdAsn,
    reservation::{BwCls, ReservationId, SplitCls},
};

/// A single hop of a segment reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    /// AS of the hop.
    pub ia: IsdAsn,
    /// Ingress interface, 0 at the first hop.
    pub ingress: u16,
    /// Egress interface, 0 at the last hop.
    pub egress: u16,
}

/// Lightweight description of an established segment reservation, as returned by the
/// COLIBRI service of the AS owning it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationLooks {
    /// Segment reservation ID.
    pub id: ReservationId,
    /// First AS of the segment.
    pub src_ia: IsdAsn,
    /// Last AS of the segment.
    pub dst_ia: IsdAsn,
    /// Expiration time of the current reservation index.
    pub expiration_time: DateTime<Utc>,
    /// Minimum bandwidth class requested at setup.
    pub min_bw: BwCls,
    /// Maximum bandwidth class requested at setup.
    pub max_bw: BwCls,
    /// Bandwidth class actually allocated.
    pub alloc_bw: BwCls,
    /// Split between control and data traffic.
    pub split: SplitCls,
    /// Hops of the segment.
    #[serde(default)]
    pub path: Vec<PathStep>,
}

impl ReservationLooks {
    /// Creates a look with no bandwidth, no path and an expiration at the unix epoch.
    pub fn new(id: ReservationId, src_ia: IsdAsn, dst_ia: IsdAsn) -> Self {
        ReservationLooks {
            id,
            src_ia,
            dst_ia,
            expiration_time: DateTime::<Utc>::UNIX_EPOCH,
            min_bw: BwCls::default(),
            max_bw: BwCls::default(),
            alloc_bw: BwCls::default(),
            split: SplitCls::default(),
            path: Vec::new(),
        }
    }

    /// Bandwidth in kbps an E2E reservation can use for data over this segment.
    pub fn data_bw_kbps(&self) -> u64 {
        (self.alloc_bw.to_kbps() as f64 * self.split.split_for_data()) as u64
    }
}

impl fmt::Display for ReservationLooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}>{} [{}] bw={}/{}/{} split={}",
            self.src_ia, self.dst_ia, self.id, self.min_bw, self.max_bw, self.alloc_bw, self.split
        )
    }
}

/// Errors of [StitchableSegments::validate].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StitchableSegmentsError {
    /// Up segment that does not start at the source AS.
    #[error("up segment {id} starts at {actual}, expected {expected}")]
    UpSegmentSource {
        /// Offending segment.
        id: ReservationId,
        /// Expected source.
        expected: IsdAsn,
        /// Actual source.
        actual: IsdAsn,
    },
    /// Down segment that does not end at the destination AS.
    #[error("down segment {id} ends at {actual}, expected {expected}")]
    DownSegmentDestination {
        /// Offending segment.
        id: ReservationId,
        /// Expected destination.
        expected: IsdAsn,
        /// Actual destination.
        actual: IsdAsn,
    },
    /// Segment starting and ending in the same AS.
    #[error("segment {0} starts and ends in the same AS")]
    SelfLoop(ReservationId),
}

/// Segment reservations from which end-to-end reservations from `src_ia` to `dst_ia` can be
/// stitched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StitchableSegments {
    /// Source AS of the E2E reservation.
    pub src_ia: IsdAsn,
    /// Destination AS of the E2E reservation.
    pub dst_ia: IsdAsn,
    /// Up segments, starting at `src_ia`.
    #[serde(default)]
    pub up: Vec<Arc<ReservationLooks>>,
    /// Core segments, linking two core ASes.
    #[serde(default)]
    pub core: Vec<Arc<ReservationLooks>>,
    /// Down segments, ending at `dst_ia`.
    #[serde(default)]
    pub down: Vec<Arc<ReservationLooks>>,
}

impl StitchableSegments {
    /// Creates an empty set of segments.
    pub fn new(src_ia: IsdAsn, dst_ia: IsdAsn) -> Self {
        StitchableSegments {
            src_ia,
            dst_ia,
            ..Default::default()
        }
    }

    /// Returns true if there are no segments at all.
    pub fn is_empty(&self) -> bool {
        self.up.is_empty() && self.core.is_empty() && self.down.is_empty()
    }

    /// Checks the structural invariants of the segment sets.
    pub fn validate(&self) -> Result<(), StitchableSegmentsError> {
        let mut all = self.up.iter().chain(&self.core).chain(&self.down);
        if let Some(l) = all.find(|l| l.src_ia == l.dst_ia) {
            return Err(StitchableSegmentsError::SelfLoop(l.id));
        }
        if let Some(l) = self.up.iter().find(|l| l.src_ia != self.src_ia) {
            return Err(StitchableSegmentsError::UpSegmentSource {
                id: l.id,
                expected: self.src_ia,
                actual: l.src_ia,
            });
        }
        if let Some(l) = self.down.iter().find(|l| l.dst_ia != self.dst_ia) {
            return Err(StitchableSegmentsError::DownSegmentDestination {
                id: l.id,
                expected: self.dst_ia,
                actual: l.dst_ia,
            });
        }
        Ok(())
    }
}

impl fmt::Display for StitchableSegments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} -> {}", self.src_ia, self.dst_ia)?;
        for (name, looks) in [("up", &self.up), ("core", &self.core), ("down", &self.down)] {
            writeln!(f, "  {name}: {}", looks.len())?;
            for l in looks {
                writeln!(f, "    {l}")?;
            }
        }
        Ok(())
    }
}
