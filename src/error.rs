use std::io;

use thiserror::Error;

/// Everything that can go wrong while turning one track file into a summary.
///
/// Each variant carries the source identifier so a failure can be reported
/// without the caller having to remember which file it belonged to.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("{source_id}: could not read source: {source}")]
    SourceUnreadable {
        source_id: String,
        #[source]
        source: io::Error,
    },

    #[error("{source_id}: malformed track document: {reason}")]
    MalformedDocument { source_id: String, reason: String },

    #[error("{source_id}: invalid {field} value '{value}'")]
    InvalidNumericField {
        source_id: String,
        field: &'static str,
        value: String,
    },

    #[error("{source_id}: {coordinates} trackpoints but {elevations} elevation values")]
    MismatchedSequenceLengths {
        source_id: String,
        coordinates: usize,
        elevations: usize,
    },
}

impl TrackError {
    pub fn source_id(&self) -> &str {
        match self {
            Self::SourceUnreadable { source_id, .. }
            | Self::MalformedDocument { source_id, .. }
            | Self::InvalidNumericField { source_id, .. }
            | Self::MismatchedSequenceLengths { source_id, .. } => source_id,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackError>;
