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

//! Stitching of segment reservations into end-to-end trips.
//!
//! A trip consists of at most one up segment, followed by a chain of zero or more core
//! segments, followed by at most one down segment. Either leg may be missing when the source or
//! the destination is itself a core AS, or when a single up or down segment already connects
//! both ends.
//!
//! The core segments form a directed graph over the ASes they connect. From every possible
//! starting point (the end of each up segment, and the source itself) the graph is searched
//! depth-first for chains ending either at the destination or at the start of a down segment.
//! No AS is visited twice within a trip, so cycles in the core graph neither loop nor produce
//! duplicate trips.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use super::{
    full_trip::FullTrip,
    looks::{ReservationLooks, StitchableSegments},
};
use crate::address::IsdAsn;

/// Combines the stitchable segments into every possible full trip from their source to their
/// destination.
///
/// Passing `None` yields no trips. The result is empty if no trip exists.
pub fn combine_all(segments: Option<&StitchableSegments>) -> Vec<FullTrip> {
    let Some(segments) = segments else {
        return Vec::new();
    };

    let stitcher = Stitcher::new(segments);
    let mut trips = Vec::new();
    stitcher.combine(&mut trips);

    tracing::trace!(
        src = %segments.src_ia,
        dst = %segments.dst_ia,
        n_up = segments.up.len(),
        n_core = segments.core.len(),
        n_down = segments.down.len(),
        n_trips = trips.len(),
        "Combined stitchable segments"
    );
    trips
}

impl StitchableSegments {
    /// Combines these segments into every possible full trip. See [combine_all].
    pub fn combine_all(&self) -> Vec<FullTrip> {
        combine_all(Some(self))
    }
}

struct Stitcher<'a> {
    segments: &'a StitchableSegments,
    core_edges: HashMap<IsdAsn, Vec<&'a Arc<ReservationLooks>>>,
}

impl<'a> Stitcher<'a> {
    fn new(segments: &'a StitchableSegments) -> Self {
        let mut core_edges: HashMap<IsdAsn, Vec<_>> = HashMap::new();
        for core in &segments.core {
            core_edges.entry(core.src_ia).or_default().push(core);
        }
        Stitcher {
            segments,
            core_edges,
        }
    }

    fn combine(&self, trips: &mut Vec<FullTrip>) {
        let segments = self.segments;
        let src = segments.src_ia;
        if src == segments.dst_ia {
            return;
        }

        for up in &segments.up {
            if up.src_ia != src || up.dst_ia == src {
                continue;
            }
            let mut trail = Trail::new(src);
            trail.push(up);
            self.extend(&mut trail, trips);
        }

        // Source is a core AS, or directly connected by a down segment.
        let mut trail = Trail::new(src);
        self.extend(&mut trail, trips);
    }

    fn extend(&self, trail: &mut Trail<'a>, trips: &mut Vec<FullTrip>) {
        let dst = self.segments.dst_ia;
        let head = trail.head();

        if head == dst {
            trips.push(trail.to_trip(None));
            return;
        }

        for down in &self.segments.down {
            if down.src_ia == head && down.dst_ia == dst {
                trips.push(trail.to_trip(Some(down)));
            }
        }

        let Some(edges) = self.core_edges.get(&head) else {
            return;
        };
        for &core in edges {
            if trail.contains(core.dst_ia) {
                continue;
            }
            trail.push(core);
            self.extend(trail, trips);
            trail.pop();
        }
    }
}

/// The segments chosen so far, together with the ASes they visit.
struct Trail<'a> {
    src: IsdAsn,
    segments: Vec<&'a Arc<ReservationLooks>>,
    visited: HashSet<IsdAsn>,
}

impl<'a> Trail<'a> {
    fn new(src: IsdAsn) -> Self {
        Trail {
            src,
            segments: Vec::new(),
            visited: HashSet::from([src]),
        }
    }

    fn head(&self) -> IsdAsn {
        self.segments.last().map_or(self.src, |l| l.dst_ia)
    }

    fn contains(&self, ia: IsdAsn) -> bool {
        self.visited.contains(&ia)
    }

    fn push(&mut self, segment: &'a Arc<ReservationLooks>) {
        self.visited.insert(segment.dst_ia);
        self.segments.push(segment);
    }

    fn pop(&mut self) {
        if let Some(segment) = self.segments.pop() {
            self.visited.remove(&segment.dst_ia);
        }
    }

    fn to_trip(&self, last: Option<&Arc<ReservationLooks>>) -> FullTrip {
        self.segments
            .iter()
            .copied()
            .chain(last)
            .cloned()
            .collect::<Vec<_>>()
            .into()
    }
}
