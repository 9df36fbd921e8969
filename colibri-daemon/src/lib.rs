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

//! # COLIBRI daemon
//!
//! The end host daemon answers path and reservation questions of local applications:
//!
//! - Which paths lead to a destination AS? Identical concurrent requests are coalesced into
//!   a single upstream fetch, see [server::DaemonServer::paths].
//! - Which end-to-end COLIBRI reservations can be stitched from the segment reservations
//!   towards a destination? See [server::DaemonServer::colibri_trips].
//!
//! The daemon also forwards E2E reservation setup, cleanup and admission requests to the
//! local COLIBRI service.
//!
//! Everything the daemon talks to is abstracted behind the traits in [fetcher].

pub mod config;
pub mod dedupe;
pub mod fetcher;
pub mod metrics;
pub mod path;
pub mod reservation;
pub mod server;
pub mod types;
