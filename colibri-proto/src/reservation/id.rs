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

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

use super::ReservationError;
use crate::address::Asn;

/// Reservation ID suffix. Segment and E2E reservations use suffixes of different lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdSuffix {
    /// Segment reservation suffix.
    Segment([u8; ReservationId::SEGMENT_SUFFIX_LEN]),
    /// End-to-end reservation suffix.
    E2e([u8; ReservationId::E2E_SUFFIX_LEN]),
}

impl IdSuffix {
    /// Raw suffix bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IdSuffix::Segment(b) => b,
            IdSuffix::E2e(b) => b,
        }
    }
}

/// Reservation ID: the ASN of the reserving AS followed by a per-AS suffix.
///
/// Wire layout (big-endian):
///
/// ```text
/// | ASN (6 bytes) | suffix (4 bytes for segments, 12 bytes for E2E) |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReservationId {
    /// ASN of the AS that owns the reservation.
    pub asn: Asn,
    /// Per-AS suffix.
    pub suffix: IdSuffix,
}

impl ReservationId {
    /// Length of a segment ID suffix.
    pub const SEGMENT_SUFFIX_LEN: usize = 4;
    /// Length of an E2E ID suffix.
    pub const E2E_SUFFIX_LEN: usize = 12;
    /// Length of a raw segment ID.
    pub const SEGMENT_LEN: usize = Asn::ENCODED_LEN + Self::SEGMENT_SUFFIX_LEN;
    /// Length of a raw E2E ID.
    pub const E2E_LEN: usize = Asn::ENCODED_LEN + Self::E2E_SUFFIX_LEN;

    /// Creates a segment reservation ID with the given sequence suffix.
    pub fn new_segment(asn: Asn, suffix: u32) -> Self {
        let mut id = ReservationId {
            asn,
            suffix: IdSuffix::Segment([0; Self::SEGMENT_SUFFIX_LEN]),
        };
        id.set_segment_suffix(suffix);
        id
    }

    /// Creates an E2E reservation ID.
    pub fn new_e2e(asn: Asn, suffix: [u8; Self::E2E_SUFFIX_LEN]) -> Self {
        ReservationId {
            asn,
            suffix: IdSuffix::E2e(suffix),
        }
    }

    /// Turns this ID into a segment ID whose suffix encodes `suffix` in big-endian order.
    pub fn set_segment_suffix(&mut self, suffix: u32) {
        self.suffix = IdSuffix::Segment(suffix.to_be_bytes());
    }

    /// Returns true for segment reservation IDs.
    pub fn is_segment_id(&self) -> bool {
        matches!(self.suffix, IdSuffix::Segment(_))
    }

    /// Returns true for E2E reservation IDs.
    pub fn is_e2e_id(&self) -> bool {
        matches!(self.suffix, IdSuffix::E2e(_))
    }

    /// Encodes the ID in its wire format.
    pub fn to_raw(&self) -> Vec<u8> {
        let suffix = self.suffix.as_bytes();
        let mut raw = Vec::with_capacity(Asn::ENCODED_LEN + suffix.len());
        raw.extend_from_slice(&self.asn.to_be_bytes());
        raw.extend_from_slice(suffix);
        raw
    }

    /// Decodes an ID from its wire format.
    pub fn from_raw(raw: &[u8]) -> Result<Self, ReservationError> {
        let invalid = || ReservationError::InvalidIdLength(raw.len());
        let (asn, suffix) = raw.split_at_checked(Asn::ENCODED_LEN).ok_or_else(invalid)?;
        let asn = Asn::from_be_bytes(asn.try_into().map_err(|_| invalid())?);

        let suffix = match suffix.len() {
            Self::SEGMENT_SUFFIX_LEN => IdSuffix::Segment(suffix.try_into().map_err(|_| invalid())?),
            Self::E2E_SUFFIX_LEN => IdSuffix::E2e(suffix.try_into().map_err(|_| invalid())?),
            _ => return Err(invalid()),
        };
        Ok(ReservationId { asn, suffix })
    }
}

impl Ord for ReservationId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.asn
            .cmp(&other.asn)
            .then_with(|| self.suffix.as_bytes().cmp(other.suffix.as_bytes()))
    }
}

impl PartialOrd for ReservationId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-", self.asn)?;
        for b in self.suffix.as_bytes() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for ReservationId {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReservationError::InvalidId(s.to_string());
        let (asn, suffix) = s.rsplit_once('-').ok_or_else(invalid)?;
        let asn: Asn = asn.parse().map_err(|_| invalid())?;

        if suffix.len() % 2 != 0 || !suffix.is_ascii() {
            return Err(invalid());
        }
        let bytes = (0..suffix.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&suffix[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| invalid())?;

        let mut raw = asn.to_be_bytes().to_vec();
        raw.extend_from_slice(&bytes);
        ReservationId::from_raw(&raw).map_err(|_| invalid())
    }
}

impl Serialize for ReservationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReservationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASN: Asn = Asn(0xff00_0000_0110);

    #[test]
    fn should_encode_segment_id() {
        let id = ReservationId::new_segment(ASN, 3);
        assert!(id.is_segment_id());
        assert_eq!(
            id.to_raw(),
            vec![0xff, 0x00, 0x00, 0x00, 0x01, 0x10, 0x00, 0x00, 0x00, 0x03]
        );
        assert_eq!(id.to_raw().len(), ReservationId::SEGMENT_LEN);
        assert_eq!(id.to_string(), "ff00:0:110-00000003");
    }

    #[test]
    fn should_overwrite_suffix() {
        let mut id = ReservationId::new_e2e(ASN, [0xaa; 12]);
        assert!(id.is_e2e_id());
        id.set_segment_suffix(0x0102_0304);
        assert!(id.is_segment_id());
        assert_eq!(id.suffix.as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn should_decode_raw_ids() {
        let seg = ReservationId::new_segment(ASN, 42);
        assert_eq!(ReservationId::from_raw(&seg.to_raw()), Ok(seg));

        let e2e = ReservationId::new_e2e(ASN, [7; 12]);
        let raw = e2e.to_raw();
        assert_eq!(raw.len(), ReservationId::E2E_LEN);
        assert_eq!(ReservationId::from_raw(&raw), Ok(e2e));

        assert_eq!(
            ReservationId::from_raw(&[0; 11]),
            Err(ReservationError::InvalidIdLength(11))
        );
        assert_eq!(
            ReservationId::from_raw(&[0; 3]),
            Err(ReservationError::InvalidIdLength(3))
        );
    }

    #[test]
    fn should_parse_text_form() {
        let id: ReservationId = "ff00:0:110-00000003".parse().unwrap();
        assert_eq!(id, ReservationId::new_segment(ASN, 3));
        assert!("ff00:0:110-000003".parse::<ReservationId>().is_err());
        assert!("ff00:0:110".parse::<ReservationId>().is_err());
    }

    #[test]
    fn should_order_by_asn_then_suffix() {
        let a = ReservationId::new_segment(Asn(1), 9);
        let b = ReservationId::new_segment(Asn(2), 1);
        let c = ReservationId::new_segment(Asn(2), 2);
        assert!(a < b);
        assert!(b < c);
    }
}
