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
//! COLIBRI reservation primitives.
//!
//! The numeric conversions and the ID byte layout defined here are shared with every COLIBRI
//! service on the path and must stay bit compatible.

mod bandwidth;
mod id;

pub use bandwidth::{BwCls, SplitCls};
pub use id::{IdSuffix, ReservationId};

/// Errors for malformed reservation primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReservationError {
    /// Bandwidth class above [BwCls::MAX].
    #[error("invalid bandwidth class: {0}")]
    InvalidBwCls(u8),
    /// Raw reservation ID with a length that is neither a segment nor an E2E ID.
    #[error("invalid reservation ID length: {0}")]
    InvalidIdLength(usize),
    /// Reservation ID text that does not have the `<asn>-<hex suffix>` form.
    #[error("invalid reservation ID: {0}")]
    InvalidId(String),
}
