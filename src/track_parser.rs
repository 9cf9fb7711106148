//! Track file parsing
//!
//! Reads a GPX document and turns every trackpoint into a typed, validated
//! `Fix`. All segments of all tracks are concatenated in document order and
//! treated as one continuous path.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use gpx::read;
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, TrackError};

/// One sampled point of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters, may be negative.
    pub elevation: f64,
}

impl Fix {
    /// Builds a fix, rejecting non-finite values and out of range coordinates.
    pub fn new(source_id: &str, latitude: f64, longitude: f64, elevation: f64) -> Result<Self> {
        check_field(source_id, "lat", latitude, -90.0..=90.0)?;
        check_field(source_id, "lon", longitude, -180.0..=180.0)?;
        check_field(source_id, "ele", elevation, f64::MIN..=f64::MAX)?;

        Ok(Self { latitude, longitude, elevation })
    }
}

fn check_field(
    source_id: &str,
    field: &'static str,
    value: f64,
    range: std::ops::RangeInclusive<f64>,
) -> Result<()> {
    if value.is_finite() && range.contains(&value) {
        Ok(())
    } else {
        Err(TrackError::InvalidNumericField {
            source_id: source_id.to_string(),
            field,
            value: value.to_string(),
        })
    }
}

/// A parsed excursion: identity derived from the source identifier plus the
/// fixes in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    pub source_id: String,
    pub date: String,
    pub fixes: Vec<Fix>,
}

impl Track {
    pub fn new(source_id: &str, fixes: Vec<Fix>) -> Self {
        Self {
            name: track_name(source_id).to_string(),
            source_id: source_id.to_string(),
            date: track_date(source_id).to_string(),
            fixes,
        }
    }

    pub fn elevations(&self) -> Vec<f64> {
        self.fixes.iter().map(|f| f.elevation).collect()
    }
}

/// Everything before the first `.`.
pub fn track_name(source_id: &str) -> &str {
    source_id.split('.').next().unwrap_or(source_id)
}

/// Everything before the first `_`, or the whole identifier when there is none.
pub fn track_date(source_id: &str) -> &str {
    source_id.split('_').next().unwrap_or(source_id)
}

/// File name of `path`, used as the source identifier.
pub fn source_id_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn parse_track_file(path: &Path) -> Result<Track> {
    let source_id = source_id_for(path);

    let file = File::open(path).map_err(|source| TrackError::SourceUnreadable {
        source_id: source_id.clone(),
        source,
    })?;

    parse_track(&source_id, BufReader::new(file))
}

pub fn parse_track<R: Read>(source_id: &str, mut reader: R) -> Result<Track> {
    let mut raw = Vec::new();
    reader
        .read_to_end(&mut raw)
        .map_err(|source| TrackError::SourceUnreadable {
            source_id: source_id.to_string(),
            source,
        })?;

    let gpx = read(raw.as_slice()).map_err(|e| classify_read_error(source_id, &raw, e))?;

    // Coordinates and elevations are gathered as two lists so a trackpoint
    // without <ele> shows up as a length mismatch rather than a shifted pairing.
    let mut coordinates = Vec::new();
    let mut elevations = Vec::new();

    for track in &gpx.tracks {
        for segment in &track.segments {
            for point in &segment.points {
                coordinates.push((point.point().y(), point.point().x()));
                if let Some(ele) = point.elevation {
                    elevations.push(ele);
                }
            }
        }
    }

    if coordinates.len() != elevations.len() {
        return Err(TrackError::MismatchedSequenceLengths {
            source_id: source_id.to_string(),
            coordinates: coordinates.len(),
            elevations: elevations.len(),
        });
    }

    let fixes = coordinates
        .into_iter()
        .zip(elevations)
        .map(|((lat, lon), ele)| Fix::new(source_id, lat, lon, ele))
        .collect::<Result<Vec<_>>>()?;

    debug!("{}: parsed {} trackpoints", source_id, fixes.len());

    Ok(Track::new(source_id, fixes))
}

/// The GPX reader reports bad numbers as generic document errors. Rescan the
/// document so a bad trackpoint coordinate or elevation is reported as such.
fn classify_read_error(source_id: &str, raw: &[u8], err: gpx::errors::GpxError) -> TrackError {
    let bad_field = std::str::from_utf8(raw)
        .ok()
        .and_then(find_invalid_numeric_field);

    match bad_field {
        Some((field, value)) => TrackError::InvalidNumericField {
            source_id: source_id.to_string(),
            field,
            value,
        },
        None => TrackError::MalformedDocument {
            source_id: source_id.to_string(),
            reason: err.to_string(),
        },
    }
}

/// First `trkpt` lat/lon or `ele` text that is not a finite, in-range number.
fn find_invalid_numeric_field(xml: &str) -> Option<(&'static str, String)> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"trkpt" => {
                if let Some(bad) = invalid_lat_lon(&e) {
                    return Some(bad);
                }
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"ele" => {
                let text = reader.read_text(e.name()).ok()?;
                let value = text.trim();
                let usable = value.parse::<f64>().map(f64::is_finite).unwrap_or(false);
                if !usable {
                    return Some(("ele", value.to_string()));
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn invalid_lat_lon(e: &BytesStart<'_>) -> Option<(&'static str, String)> {
    for attr in e.attributes().flatten() {
        let key = attr.key.local_name();
        let (field, range) = match key.as_ref() {
            b"lat" => ("lat", -90.0..=90.0),
            b"lon" => ("lon", -180.0..=180.0),
            _ => continue,
        };

        let value = String::from_utf8_lossy(&attr.value).trim().to_string();
        let usable = value
            .parse::<f64>()
            .map(|v| v.is_finite() && range.contains(&v))
            .unwrap_or(false);
        if !usable {
            return Some((field, value));
        }
    }
    None
}
