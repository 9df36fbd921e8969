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
//! Utility for constructing deterministic stitching tests.
//!
//! ASes are referred to by index: `0` is the source, `1` is the destination and `2..` are the
//! core ASes in the order they were declared with `with_core_ases`/`with_cores`.
//!
//! Segment IDs are assigned from one counter per segment type, so the n-th up segment created
//! by a [StitchableSegmentsBuilder] has the same ID as the n-th up segment created by a
//! [FullTripsBuilder] with the same ASes. This allows comparing the output of stitching with
//! an expected set of trips.
//!
//! #### Building stitchable segments
//! ```ignore
//! let stitchable = StitchableSegmentsBuilder::new("1-ff00:0:111", "1-ff00:0:112")
//!     .with_core_ases(&["1-ff00:0:110", "1-ff00:0:120"])
//!     .with_up_segs(&[2]) // src -> 1-ff00:0:110
//!     .with_core_segs(&[(2, 3), (3, 2)])
//!     .with_down_segs(&[3]) // 1-ff00:0:120 -> dst
//!     .build()?;
//! ```
//!
//! #### Building the expected trips
//! ```ignore
//! let expected = FullTripsBuilder::new("1-ff00:0:111", "1-ff00:0:112")
//!     .with_cores(&["1-ff00:0:110", "1-ff00:0:120"])
//!     .with_trip(&[U(0, 2), C(2, 3), D(3, 1)])
//!     .build()?;
//! ```

use std::{collections::HashMap, fmt, sync::Arc};

use chrono::{DateTime, Utc};

use super::{
    full_trip::FullTrip,
    looks::{PathStep, ReservationLooks, StitchableSegments},
};
use crate::{
    address::IsdAsn,
    reservation::{BwCls, ReservationId, SplitCls},
};

/// Kind of a segment reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegType {
    /// From the source to a core AS.
    Up,
    /// Between two core ASes.
    Core,
    /// From a core AS to the destination.
    Down,
}

impl fmt::Display for SegType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegType::Up => write!(f, "up"),
            SegType::Core => write!(f, "core"),
            SegType::Down => write!(f, "down"),
        }
    }
}

/// Which bandwidth field of a segment to set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BwSelector {
    /// Minimum requested bandwidth.
    Min,
    /// Maximum requested bandwidth.
    Max,
    /// Allocated bandwidth.
    Alloc,
}

/// A segment of an expected trip, given by the indices of its first and last AS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripSeg {
    /// Up segment.
    U(usize, usize),
    /// Core segment.
    C(usize, usize),
    /// Down segment.
    D(usize, usize),
}

impl TripSeg {
    fn parts(self) -> (SegType, usize, usize) {
        match self {
            TripSeg::U(a, b) => (SegType::Up, a, b),
            TripSeg::C(a, b) => (SegType::Core, a, b),
            TripSeg::D(a, b) => (SegType::Down, a, b),
        }
    }
}

/// Errors of the test builders.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TestBuilderError {
    /// An AS could not be parsed.
    #[error("invalid ISD-AS: {0}")]
    InvalidIsdAsn(String),
    /// An AS index that refers to neither source, destination nor a declared core AS.
    #[error("unknown AS index {index} (have {n_cores} core ASes)")]
    UnknownIndex {
        /// The index.
        index: usize,
        /// Number of declared core ASes.
        n_cores: usize,
    },
    /// A segment from an AS to itself.
    #[error("segment links AS index {0} to itself")]
    SelfLink(usize),
    /// An up segment ending at the source.
    #[error("up segment cannot end at the source")]
    UpToSource,
    /// A down segment starting at the destination.
    #[error("down segment cannot start at the destination")]
    DownFromDestination,
    /// A modification of a segment that was never added.
    #[error("no {0} segment with index {1}")]
    NoSuchSegment(SegType, usize),
}

/// Resolves AS indices.
#[derive(Debug, Clone)]
struct IndexedAses {
    src: IsdAsn,
    dst: IsdAsn,
    cores: Vec<IsdAsn>,
}

impl IndexedAses {
    fn new(src: &str, dst: &str) -> Result<Self, TestBuilderError> {
        Ok(IndexedAses {
            src: parse_ia(src)?,
            dst: parse_ia(dst)?,
            cores: Vec::new(),
        })
    }

    fn add_cores(&mut self, cores: &[&str]) -> Result<(), TestBuilderError> {
        for core in cores {
            self.cores.push(parse_ia(core)?);
        }
        Ok(())
    }

    fn resolve(&self, index: usize) -> Result<IsdAsn, TestBuilderError> {
        match index {
            0 => Ok(self.src),
            1 => Ok(self.dst),
            i => self
                .cores
                .get(i - 2)
                .copied()
                .ok_or(TestBuilderError::UnknownIndex {
                    index,
                    n_cores: self.cores.len(),
                }),
        }
    }
}

fn parse_ia(s: &str) -> Result<IsdAsn, TestBuilderError> {
    s.parse()
        .map_err(|_| TestBuilderError::InvalidIsdAsn(s.to_string()))
}

/// Hands out segment IDs, one counter per segment type.
#[derive(Debug, Default, Clone)]
struct IdCounters {
    up: u32,
    core: u32,
    down: u32,
}

impl IdCounters {
    fn next(&mut self, seg_type: SegType, ases: &IndexedAses, owner: IsdAsn) -> ReservationId {
        let counter = match seg_type {
            SegType::Up => &mut self.up,
            SegType::Core => &mut self.core,
            SegType::Down => &mut self.down,
        };
        *counter += 1;
        // Up segments are owned by the source, down segments by the destination.
        let asn = match seg_type {
            SegType::Up => ases.src.asn(),
            SegType::Core => owner.asn(),
            SegType::Down => ases.dst.asn(),
        };
        ReservationId::new_segment(asn, *counter)
    }
}

fn new_look(
    ases: &IndexedAses,
    ids: &mut IdCounters,
    seg_type: SegType,
    from: usize,
    to: usize,
) -> Result<ReservationLooks, TestBuilderError> {
    match seg_type {
        SegType::Up if to == 0 => return Err(TestBuilderError::UpToSource),
        SegType::Down if from == 1 => return Err(TestBuilderError::DownFromDestination),
        _ if from == to => return Err(TestBuilderError::SelfLink(from)),
        _ => {}
    }
    let src_ia = ases.resolve(from)?;
    let dst_ia = ases.resolve(to)?;
    let id = ids.next(seg_type, ases, src_ia);
    Ok(ReservationLooks::new(id, src_ia, dst_ia))
}

/// Builds [StitchableSegments] for tests.
///
/// Errors are recorded and returned by [StitchableSegmentsBuilder::build]; the first error
/// wins.
#[derive(Debug)]
pub struct StitchableSegmentsBuilder {
    ases: IndexedAses,
    ids: IdCounters,
    up: Vec<ReservationLooks>,
    core: Vec<ReservationLooks>,
    down: Vec<ReservationLooks>,
    error: Option<TestBuilderError>,
}

impl StitchableSegmentsBuilder {
    /// Creates a builder for segments from `src` to `dst`.
    pub fn new(src: &str, dst: &str) -> Self {
        let (ases, error) = match IndexedAses::new(src, dst) {
            Ok(ases) => (ases, None),
            Err(e) => (
                IndexedAses {
                    src: IsdAsn::ZERO,
                    dst: IsdAsn::ZERO,
                    cores: Vec::new(),
                },
                Some(e),
            ),
        };
        StitchableSegmentsBuilder {
            ases,
            ids: IdCounters::default(),
            up: Vec::new(),
            core: Vec::new(),
            down: Vec::new(),
            error,
        }
    }

    /// Declares the core ASes, which get indices starting at 2.
    pub fn with_core_ases(mut self, cores: &[&str]) -> Self {
        let res = self.ases.add_cores(cores);
        self.record(res);
        self
    }

    /// Adds one up segment from the source to each of the given ASes.
    pub fn with_up_segs(mut self, to: &[usize]) -> Self {
        for &to in to {
            self.add(SegType::Up, 0, to);
        }
        self
    }

    /// Adds one down segment from each of the given ASes to the destination.
    pub fn with_down_segs(mut self, from: &[usize]) -> Self {
        for &from in from {
            self.add(SegType::Down, from, 1);
        }
        self
    }

    /// Adds core segments between the given pairs of ASes.
    pub fn with_core_segs(mut self, links: &[(usize, usize)]) -> Self {
        for &(from, to) in links {
            self.add(SegType::Core, from, to);
        }
        self
    }

    /// Sets one of the bandwidth classes of a segment.
    pub fn with_bw(
        mut self,
        seg_type: SegType,
        index: usize,
        selector: BwSelector,
        cls: BwCls,
    ) -> Self {
        self.modify(seg_type, index, |l| match selector {
            BwSelector::Min => l.min_bw = cls,
            BwSelector::Max => l.max_bw = cls,
            BwSelector::Alloc => l.alloc_bw = cls,
        });
        self
    }

    /// Sets the split class of a segment.
    pub fn with_split(mut self, seg_type: SegType, index: usize, split: SplitCls) -> Self {
        self.modify(seg_type, index, |l| l.split = split);
        self
    }

    /// Sets the hops of a segment.
    pub fn with_path(mut self, seg_type: SegType, index: usize, path: Vec<PathStep>) -> Self {
        self.modify(seg_type, index, |l| l.path = path);
        self
    }

    /// Sets the expiration time of a segment.
    pub fn with_expiration(
        mut self,
        seg_type: SegType,
        index: usize,
        expiration_time: DateTime<Utc>,
    ) -> Self {
        self.modify(seg_type, index, |l| l.expiration_time = expiration_time);
        self
    }

    /// Builds the segments.
    pub fn build(self) -> Result<StitchableSegments, TestBuilderError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let wrap = |looks: Vec<ReservationLooks>| -> Vec<Arc<ReservationLooks>> {
            looks.into_iter().map(Arc::new).collect()
        };
        Ok(StitchableSegments {
            src_ia: self.ases.src,
            dst_ia: self.ases.dst,
            up: wrap(self.up),
            core: wrap(self.core),
            down: wrap(self.down),
        })
    }

    fn add(&mut self, seg_type: SegType, from: usize, to: usize) {
        match new_look(&self.ases, &mut self.ids, seg_type, from, to) {
            Ok(look) => self.segments_mut(seg_type).push(look),
            Err(e) => self.record(Err(e)),
        }
    }

    fn modify(&mut self, seg_type: SegType, index: usize, f: impl FnOnce(&mut ReservationLooks)) {
        match self.segments_mut(seg_type).get_mut(index) {
            Some(look) => f(look),
            None => self.record(Err(TestBuilderError::NoSuchSegment(seg_type, index))),
        }
    }

    fn segments_mut(&mut self, seg_type: SegType) -> &mut Vec<ReservationLooks> {
        match seg_type {
            SegType::Up => &mut self.up,
            SegType::Core => &mut self.core,
            SegType::Down => &mut self.down,
        }
    }

    fn record(&mut self, res: Result<(), TestBuilderError>) {
        if let Err(e) = res {
            self.error.get_or_insert(e);
        }
    }
}

/// Builds the expected [FullTrip]s for tests.
///
/// A segment used by several trips is created once and shared between them.
#[derive(Debug)]
pub struct FullTripsBuilder {
    ases: Result<IndexedAses, TestBuilderError>,
    ids: IdCounters,
    created: HashMap<TripSeg, Arc<ReservationLooks>>,
    trips: Vec<Vec<TripSeg>>,
}

impl FullTripsBuilder {
    /// Creates a builder for trips from `src` to `dst`.
    pub fn new(src: &str, dst: &str) -> Self {
        FullTripsBuilder {
            ases: IndexedAses::new(src, dst),
            ids: IdCounters::default(),
            created: HashMap::new(),
            trips: Vec::new(),
        }
    }

    /// Declares the core ASes, which get indices starting at 2.
    pub fn with_cores(mut self, cores: &[&str]) -> Self {
        if let Ok(ases) = &mut self.ases {
            if let Err(e) = ases.add_cores(cores) {
                self.ases = Err(e);
            }
        }
        self
    }

    /// Adds a trip made of the given segments.
    pub fn with_trip(mut self, segments: &[TripSeg]) -> Self {
        self.trips.push(segments.to_vec());
        self
    }

    /// Builds the trips, in the order they were added.
    pub fn build(mut self) -> Result<Vec<FullTrip>, TestBuilderError> {
        let ases = self.ases?;
        let mut trips = Vec::with_capacity(self.trips.len());
        for trip in &self.trips {
            let mut segments = Vec::with_capacity(trip.len());
            for &seg in trip {
                let look = match self.created.get(&seg) {
                    Some(look) => look.clone(),
                    None => {
                        let (seg_type, from, to) = seg.parts();
                        let look =
                            Arc::new(new_look(&ases, &mut self.ids, seg_type, from, to)?);
                        self.created.insert(seg, look.clone());
                        look
                    }
                };
                segments.push(look);
            }
            trips.push(FullTrip::new(segments));
        }
        Ok(trips)
    }
}
