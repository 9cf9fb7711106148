use std::path::Path;

use log::info;
use serde::Serialize;

use crate::distance::total_distance_miles;
use crate::elevation::{analyze_elevation, ElevationStats};
use crate::error::Result;
use crate::track_parser::{parse_track_file, Track};

/// Final per-track record. Built once from a parsed track and never changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    date: String,
    name: String,
    source_id: String,
    elevation_gain_ft: u32,
    elevation_loss_ft: u32,
    distance_mi: f64,
}

impl TrackSummary {
    pub fn new(track: &Track, elevation: ElevationStats, distance_mi: f64) -> Self {
        Self {
            date: track.date.clone(),
            name: track.name.clone(),
            source_id: track.source_id.clone(),
            elevation_gain_ft: elevation.gain_ft,
            elevation_loss_ft: elevation.loss_ft,
            distance_mi,
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn elevation_gain_ft(&self) -> u32 {
        self.elevation_gain_ft
    }

    pub fn elevation_loss_ft(&self) -> u32 {
        self.elevation_loss_ft
    }

    pub fn distance_mi(&self) -> f64 {
        self.distance_mi
    }
}

pub fn summarize_track(track: &Track) -> TrackSummary {
    let elevation = analyze_elevation(&track.elevations());
    let distance = total_distance_miles(&track.fixes);
    TrackSummary::new(track, elevation, distance)
}

/// Full per-file pipeline: parse, analyze, summarize.
pub fn process_track_file(path: &Path) -> Result<TrackSummary> {
    let track = parse_track_file(path)?;
    let summary = summarize_track(&track);

    info!(
        "Processing of {} complete! ({:.2} mi, +{} ft / -{} ft)",
        summary.source_id, summary.distance_mi, summary.elevation_gain_ft, summary.elevation_loss_ft
    );

    Ok(summary)
}
