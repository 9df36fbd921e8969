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

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ReservationError;

/// Bandwidth class.
///
/// Formula: bandwidth_kbps = 16 * sqrt(2^(cls - 1))
///
/// Odd classes map to exact powers of two, e.g. class 1 is 16 kbps and class 13 is 1024 kbps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BwCls(pub u8);

impl BwCls {
    /// Highest valid bandwidth class.
    pub const MAX: BwCls = BwCls(63);

    /// Returns the bandwidth in kilobits per second, truncated.
    pub fn to_kbps(self) -> u64 {
        (16.0 * 2f64.powi(i32::from(self.0) - 1).sqrt()) as u64
    }

    /// Returns the smallest class whose bandwidth is at least `kbps`.
    ///
    /// Inverse of the formula: cls = 2 * log2(kbps / 16) + 1, rounded up and clamped to the
    /// valid range.
    pub fn from_kbps(kbps: u64) -> BwCls {
        if kbps == 0 {
            return BwCls(0);
        }
        let cls = (2.0 * (kbps as f64 / 16.0).log2() + 1.0).ceil();
        BwCls(cls.clamp(0.0, f64::from(Self::MAX.0)) as u8)
    }

    /// Checks that the class is within the valid range.
    pub fn validate(self) -> Result<(), ReservationError> {
        if self > Self::MAX {
            return Err(ReservationError::InvalidBwCls(self.0));
        }
        Ok(())
    }
}

impl fmt::Display for BwCls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Traffic split class.
///
/// Formula: split = 2^(-cls / 8), the share of a segment's allocated bandwidth an end-to-end
/// reservation may use for data traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SplitCls(pub u8);

impl SplitCls {
    /// Returns the fraction in (0, 1] available to data traffic.
    pub fn split_for_data(self) -> f64 {
        2f64.powf(-f64::from(self.0) / 8.0)
    }
}

impl fmt::Display for SplitCls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_bw_class_to_kbps() {
        assert_eq!(BwCls(0).to_kbps(), 11);
        assert_eq!(BwCls(1).to_kbps(), 16);
        assert_eq!(BwCls(2).to_kbps(), 22);
        assert_eq!(BwCls(3).to_kbps(), 32);
        assert_eq!(BwCls(13).to_kbps(), 1024);
        assert_eq!(BwCls(63).to_kbps(), 16 << 31);
    }

    #[test]
    fn should_be_monotonic() {
        for cls in 0..BwCls::MAX.0 {
            assert!(BwCls(cls).to_kbps() < BwCls(cls + 1).to_kbps());
        }
    }

    #[test]
    fn should_invert_odd_classes() {
        for cls in (1..=BwCls::MAX.0).step_by(2) {
            assert_eq!(BwCls::from_kbps(BwCls(cls).to_kbps()), BwCls(cls));
        }
        assert_eq!(BwCls::from_kbps(0), BwCls(0));
        assert_eq!(BwCls::from_kbps(u64::MAX), BwCls::MAX);
    }

    #[test]
    fn should_order_classes_by_bandwidth() {
        assert_eq!(BwCls(13).min(BwCls(5)), BwCls(5));
        assert_eq!(BwCls(13).max(BwCls(5)), BwCls(13));
        assert_eq!(
            [BwCls(9), BwCls(2), BwCls(11)].into_iter().min(),
            Some(BwCls(2))
        );
    }

    #[test]
    fn should_reject_out_of_range_class() {
        assert!(BwCls::MAX.validate().is_ok());
        assert_eq!(
            BwCls(64).validate(),
            Err(ReservationError::InvalidBwCls(64))
        );
    }

    #[test]
    fn should_convert_split_class() {
        assert_eq!(SplitCls(0).split_for_data(), 1.0);
        assert_eq!(SplitCls(8).split_for_data(), 0.5);
        assert_eq!(SplitCls(16).split_for_data(), 0.25);

        let split = SplitCls(7).split_for_data();
        assert!(split > 0.545 && split < 0.546);
    }
}
