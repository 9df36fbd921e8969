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
//! SCION ISD-AS addressing.
//!
//! An [IsdAsn] identifies an autonomous system within an isolation domain. Its text form is
//! `<isd>-<asn>`, where ASNs in the BGP range are written in decimal and all others as three
//! colon separated 16-bit hex groups (e.g. `1-ff00:0:110`).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

/// Error returned when parsing an address component fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    /// The ISD-AS string has no `-` separator.
    #[error("missing '-' separator in ISD-AS: {0}")]
    MissingSeparator(String),
    /// The ISD part is not a valid 16-bit number.
    #[error("invalid ISD: {0}")]
    InvalidIsd(String),
    /// The ASN part is neither a BGP-style decimal nor a SCION-style hex ASN.
    #[error("invalid ASN: {0}")]
    InvalidAsn(String),
}

/// Isolation domain identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Isd(pub u16);

impl Isd {
    /// The wildcard ISD, matching any isolation domain.
    pub const WILDCARD: Isd = Isd(0);

    /// Returns true if this is the wildcard ISD.
    pub const fn is_wildcard(self) -> bool {
        self.0 == Self::WILDCARD.0
    }
}

impl fmt::Display for Isd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Isd {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u16>()
            .map(Isd)
            .map_err(|_| AddressParseError::InvalidIsd(s.to_string()))
    }
}

/// Autonomous system number. Only the lower 48 bits are used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Asn(pub u64);

impl Asn {
    /// The wildcard ASN, matching any AS.
    pub const WILDCARD: Asn = Asn(0);
    /// The largest representable ASN.
    pub const MAX: Asn = Asn((1 << Self::BITS) - 1);
    /// Number of bits of an ASN.
    pub const BITS: u32 = 48;
    /// Length of the big-endian wire encoding.
    pub const ENCODED_LEN: usize = 6;

    const BGP_MAX: u64 = u32::MAX as u64;
    const GROUP_BITS: u32 = 16;
    const GROUP_MAX: u64 = (1 << Self::GROUP_BITS) - 1;

    /// Returns true if this is the wildcard ASN.
    pub const fn is_wildcard(self) -> bool {
        self.0 == Self::WILDCARD.0
    }

    /// Big-endian 6-byte encoding.
    pub const fn to_be_bytes(self) -> [u8; Self::ENCODED_LEN] {
        let b = self.0.to_be_bytes();
        [b[2], b[3], b[4], b[5], b[6], b[7]]
    }

    /// Decodes a big-endian 6-byte ASN.
    pub const fn from_be_bytes(b: [u8; Self::ENCODED_LEN]) -> Self {
        Asn(u64::from_be_bytes([0, 0, b[0], b[1], b[2], b[3], b[4], b[5]]))
    }
}

impl fmt::Display for Asn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 <= Self::BGP_MAX {
            return write!(f, "{}", self.0);
        }
        write!(
            f,
            "{:x}:{:x}:{:x}",
            (self.0 >> (2 * Self::GROUP_BITS)) & Self::GROUP_MAX,
            (self.0 >> Self::GROUP_BITS) & Self::GROUP_MAX,
            self.0 & Self::GROUP_MAX
        )
    }
}

impl FromStr for Asn {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressParseError::InvalidAsn(s.to_string());

        if !s.contains(':') {
            return s.parse::<u32>().map(|v| Asn(v.into())).map_err(|_| invalid());
        }

        let mut value = 0u64;
        let mut groups = 0;
        for group in s.split(':') {
            if group.is_empty() || group.len() > 4 {
                return Err(invalid());
            }
            let group = u16::from_str_radix(group, 16).map_err(|_| invalid())?;
            value = (value << Self::GROUP_BITS) | u64::from(group);
            groups += 1;
        }
        if groups != 3 {
            return Err(invalid());
        }
        Ok(Asn(value))
    }
}

/// ISD-AS identifier: ISD in the upper 16 bits, ASN in the lower 48 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsdAsn(pub u64);

impl IsdAsn {
    /// The all-zero ISD-AS, used as "unspecified".
    pub const ZERO: IsdAsn = IsdAsn(0);

    /// Creates a new ISD-AS from its parts.
    pub const fn new(isd: Isd, asn: Asn) -> Self {
        IsdAsn(((isd.0 as u64) << Asn::BITS) | (asn.0 & Asn::MAX.0))
    }

    /// Returns the ISD part.
    pub const fn isd(self) -> Isd {
        Isd((self.0 >> Asn::BITS) as u16)
    }

    /// Returns the ASN part.
    pub const fn asn(self) -> Asn {
        Asn(self.0 & Asn::MAX.0)
    }

    /// Returns true if either the ISD or the ASN is a wildcard.
    pub const fn is_wildcard(self) -> bool {
        self.isd().is_wildcard() || self.asn().is_wildcard()
    }

    /// Returns true if this is the unspecified ISD-AS.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if both ISD-ASes are in the same isolation domain.
    pub const fn same_isd(self, other: IsdAsn) -> bool {
        self.isd().0 == other.isd().0
    }

    /// Big-endian 8-byte encoding.
    pub const fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl From<u64> for IsdAsn {
    fn from(value: u64) -> Self {
        IsdAsn(value)
    }
}

impl From<IsdAsn> for u64 {
    fn from(value: IsdAsn) -> Self {
        value.0
    }
}

impl fmt::Display for IsdAsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.isd(), self.asn())
    }
}

impl FromStr for IsdAsn {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (isd, asn) = s
            .split_once('-')
            .ok_or_else(|| AddressParseError::MissingSeparator(s.to_string()))?;
        Ok(IsdAsn::new(isd.parse()?, asn.parse()?))
    }
}

impl Serialize for IsdAsn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IsdAsn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

impl Serialize for Asn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Asn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_scion_style_isd_asn() {
        let ia: IsdAsn = "1-ff00:0:110".parse().unwrap();
        assert_eq!(ia.isd(), Isd(1));
        assert_eq!(ia.asn(), Asn(0xff00_0000_0110));
        assert_eq!(ia.to_string(), "1-ff00:0:110");
    }

    #[test]
    fn should_parse_bgp_style_isd_asn() {
        let ia: IsdAsn = "64-559".parse().unwrap();
        assert_eq!(ia, IsdAsn::new(Isd(64), Asn(559)));
        assert_eq!(ia.to_string(), "64-559");
    }

    #[test]
    fn should_format_small_hex_asn_as_decimal() {
        let ia: IsdAsn = "2-0:0:1".parse().unwrap();
        assert_eq!(ia.to_string(), "2-1");
    }

    #[test]
    fn should_reject_malformed_isd_asn() {
        assert_eq!(
            "1ff00:0:110".parse::<IsdAsn>(),
            Err(AddressParseError::MissingSeparator("1ff00:0:110".into()))
        );
        assert_eq!(
            "70000-1".parse::<IsdAsn>(),
            Err(AddressParseError::InvalidIsd("70000".into()))
        );
        assert_eq!(
            "1-ff00:0".parse::<IsdAsn>(),
            Err(AddressParseError::InvalidAsn("ff00:0".into()))
        );
        assert_eq!(
            "1-ff00:0:10000".parse::<IsdAsn>(),
            Err(AddressParseError::InvalidAsn("ff00:0:10000".into()))
        );
        assert_eq!(
            "1-4294967296".parse::<IsdAsn>(),
            Err(AddressParseError::InvalidAsn("4294967296".into()))
        );
    }

    #[test]
    fn should_detect_wildcards_and_isd_membership() {
        let a: IsdAsn = "1-ff00:0:110".parse().unwrap();
        let b: IsdAsn = "1-ff00:0:120".parse().unwrap();
        let c: IsdAsn = "2-ff00:0:210".parse().unwrap();

        assert!(a.same_isd(b));
        assert!(!a.same_isd(c));
        assert!(!a.is_wildcard());
        assert!(IsdAsn::new(Isd(1), Asn::WILDCARD).is_wildcard());
        assert!(IsdAsn::ZERO.is_zero());
    }

    #[test]
    fn should_encode_asn_in_six_bytes() {
        let asn = Asn(0xff00_0000_0110);
        assert_eq!(asn.to_be_bytes(), [0xff, 0x00, 0x00, 0x00, 0x01, 0x10]);
        assert_eq!(Asn::from_be_bytes(asn.to_be_bytes()), asn);
    }

    #[test]
    fn should_serialize_as_text() {
        let ia: IsdAsn = "1-ff00:0:111".parse().unwrap();
        let json = serde_json::to_string(&ia).unwrap();
        assert_eq!(json, "\"1-ff00:0:111\"");
        assert_eq!(serde_json::from_str::<IsdAsn>(&json).unwrap(), ia);
    }
}
