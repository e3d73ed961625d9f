use std::path::PathBuf;

use medley_core::{ParseLabelError, RankingError, StemIndex};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),

    #[error("Configuration parse error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Paths(#[from] medley_paths::Error),

    #[error(transparent)]
    Label(#[from] ParseLabelError),

    #[error("Track {0} not found: no metadata file at {path}", path = .1.display())]
    TrackNotFound(String, PathBuf),

    #[error("{0} is not in the instrument taxonomy")]
    InvalidInstrument(String),

    #[error("Invalid melody rankings for {track_id}: {source}")]
    InvalidRankings {
        track_id: String,
        #[source]
        source: RankingError,
    },

    #[error("Malformed annotation {}: {reason}", path.display())]
    MalformedAnnotation { path: PathBuf, reason: String },

    #[error("Malformed metadata {}: {reason}", path.display())]
    MalformedMetadata { path: PathBuf, reason: String },

    #[error("Stem {1} not found in {0}")]
    StemNotFound(String, StemIndex),

    #[error("Audio for {0} is not available; set MEDLEYDB_PATH")]
    AudioUnavailable(String),

    #[error("Incompatible audio {}: {reason}", path.display())]
    IncompatibleAudio { path: PathBuf, reason: String },

    #[error("Invalid split parameters: {0}")]
    InvalidSplit(String),

    #[error("{} does not exist, please run `medleydb export` first", .0.display())]
    DatabaseMissing(PathBuf),
}
