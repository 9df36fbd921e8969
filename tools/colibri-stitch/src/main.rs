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
//! A tool to list the end-to-end trips that can be stitched from a set of COLIBRI segment
//! reservations.
//!
//! The input is a JSON document describing the stitchable segments:
//!
//! ```json
//! {
//!     "src_ia": "1-ff00:0:111",
//!     "dst_ia": "1-ff00:0:112",
//!     "up": [ ... ],
//!     "core": [ ... ],
//!     "down": [ ... ]
//! }
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use colibri_proto::colibri::{FullTrip, StitchableSegments};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Stitches the segment reservations into trips, highest bandwidth first.
    Stitch {
        /// JSON file with the stitchable segments.
        segments: PathBuf,
        /// Print the trips as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Checks that the segment reservations are well formed.
    Validate {
        /// JSON file with the stitchable segments.
        segments: PathBuf,
    },
}

#[derive(Serialize)]
struct TripSummary<'a> {
    bw_kbps: u64,
    segments: &'a FullTrip,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Stitch { segments, json } => run_stitch(segments, json),
        Commands::Validate { segments } => {
            let segments = load_segments(&segments)?;
            println!(
                "{} -> {}: {} up, {} core, {} down segments, all valid.",
                segments.src_ia,
                segments.dst_ia,
                segments.up.len(),
                segments.core.len(),
                segments.down.len()
            );
            Ok(())
        }
    }
}

fn run_stitch(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let segments = load_segments(&path)?;

    let mut trips = segments.combine_all();
    trips.sort_by_key(|trip| std::cmp::Reverse(trip.bw()));
    tracing::info!(
        n_trips = trips.len(),
        src = %segments.src_ia,
        dst = %segments.dst_ia,
        "Stitched trips"
    );

    if json {
        let summaries: Vec<_> = trips
            .iter()
            .map(|trip| TripSummary {
                bw_kbps: trip.bw(),
                segments: trip,
            })
            .collect();
        let out = serde_json::to_string_pretty(&summaries).context("serializing trips")?;
        println!("{out}");
        return Ok(());
    }

    if trips.is_empty() {
        println!("No trips from {} to {}.", segments.src_ia, segments.dst_ia);
        return Ok(());
    }
    for (i, trip) in trips.iter().enumerate() {
        println!("[{i:>3}] {:>12} kbps  {trip}", trip.bw());
        for look in trip.segments() {
            println!("        {look}");
        }
    }
    Ok(())
}

fn load_segments(path: &Path) -> anyhow::Result<StitchableSegments> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading segments from {}", path.display()))?;
    let segments: StitchableSegments = serde_json::from_str(&content)
        .with_context(|| format!("parsing segments from {}", path.display()))?;
    segments
        .validate()
        .with_context(|| format!("validating segments from {}", path.display()))?;
    Ok(segments)
}
