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
//! End-to-end forwarding paths as handed out to daemon clients.

use std::{net::SocketAddr, time::Duration};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use colibri_proto::address::IsdAsn;

/// An interface on a path, identified by the AS it belongs to and its interface ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathInterface {
    /// AS of the interface.
    pub isd_asn: IsdAsn,
    /// Interface ID, local to the AS.
    pub id: u16,
}

/// Kind of an inter-AS link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LinkType {
    /// Unknown link type.
    #[default]
    Unspecified,
    /// Direct physical connection.
    Direct,
    /// Connection over multiple hops of a private network.
    MultiHop,
    /// Connection over the public internet.
    OpenNet,
}

/// Location of a router.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCoordinates {
    /// Latitude in degrees.
    pub latitude: f32,
    /// Longitude in degrees.
    pub longitude: f32,
    /// Civic address.
    pub address: String,
}

/// A forwarding path with its metadata.
///
/// Metadata vectors follow the usual SCION conventions: `latency`, `bandwidth` and `link_type`
/// have one entry per link (`interfaces.len() - 1` entries for a path with interfaces), `geo`
/// has one entry per interface and `internal_hops` one entry per on-path AS that is neither the
/// source nor the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Source AS.
    pub src: IsdAsn,
    /// Destination AS.
    pub dst: IsdAsn,
    /// Raw data plane path.
    pub raw: Bytes,
    /// First hop in the local AS, if any.
    pub underlay_next_hop: Option<SocketAddr>,
    /// Interfaces traversed by the path, in order.
    pub interfaces: Vec<PathInterface>,
    /// Path MTU.
    pub mtu: u16,
    /// Expiration of the path.
    pub expiry: DateTime<Utc>,
    /// Link latencies, if known.
    pub latency: Vec<Option<Duration>>,
    /// Link bandwidths in kbps, 0 if unknown.
    pub bandwidth: Vec<u64>,
    /// Router locations.
    pub geo: Vec<Option<GeoCoordinates>>,
    /// Link types.
    pub link_type: Vec<LinkType>,
    /// Number of AS internal hops.
    pub internal_hops: Vec<u32>,
    /// Free form notes of the on-path ASes.
    pub notes: Vec<String>,
}

impl Path {
    /// Creates a path without metadata.
    pub fn new(src: IsdAsn, dst: IsdAsn, raw: Bytes, expiry: DateTime<Utc>) -> Self {
        Path {
            src,
            dst,
            raw,
            underlay_next_hop: None,
            interfaces: Vec::new(),
            mtu: 0,
            expiry,
            latency: Vec::new(),
            bandwidth: Vec::new(),
            geo: Vec::new(),
            link_type: Vec::new(),
            internal_hops: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Returns true if the path stays within the source AS.
    pub fn is_empty(&self) -> bool {
        self.src == self.dst && self.raw.is_empty()
    }

    /// Sum of the known link latencies, or `None` if any is unknown.
    pub fn total_latency(&self) -> Option<Duration> {
        self.latency.iter().copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> Path {
        Path::new(
            "1-ff00:0:111".parse().unwrap(),
            "1-ff00:0:112".parse().unwrap(),
            Bytes::from_static(&[0, 1, 2, 3]),
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    #[test]
    fn should_sum_known_latencies() {
        let mut p = path();
        p.latency = vec![
            Some(Duration::from_millis(3)),
            Some(Duration::from_millis(4)),
        ];
        assert_eq!(p.total_latency(), Some(Duration::from_millis(7)));

        p.latency.push(None);
        assert_eq!(p.total_latency(), None);
    }

    #[test]
    fn should_detect_empty_path() {
        let mut p = path();
        assert!(!p.is_empty());
        p.dst = p.src;
        p.raw = Bytes::new();
        assert!(p.is_empty());
    }
}
