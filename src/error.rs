//! Error types shared by the loader, the pipelines and the validator.

use thiserror::Error;

/// An error that can occur while loading a feed or producing its documents.
///
/// Routes that lack enough data for headway statistics are not errors; see
/// [`crate::headway::SkipReason`].
#[derive(Error, Debug)]
pub enum AtlasError {
    /// The feed source (directory, archive or URL) cannot be opened
    #[error("feed source '{0}' is not available")]
    SourceUnavailable(String),
    /// A table required by the running pipeline is not in the feed
    #[error("required table {0} not found in feed")]
    MissingTable(String),
    /// The time is not given in the HH:MM:SS format
    #[error("'{0}' is not a valid time; HH:MM:SS format is expected")]
    InvalidTime(String),
    /// A trip's origin event carries neither a departure nor an arrival time
    #[error("origin stop of trip '{trip_id}' has neither a departure nor an arrival time")]
    MissingOriginTime { trip_id: String },
    /// A table could not be parsed as CSV
    #[error("impossible to read csv table '{file_name}'")]
    Csv {
        file_name: String,
        #[source]
        source: csv::Error,
    },
    /// The feed archive is not a readable zip file
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    /// The remote feed archive could not be downloaded
    #[error("impossible to download feed archive")]
    Fetch(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A written document failed the structural sanity check
    #[error("validation failed for {file}: {reason}")]
    Validation { file: String, reason: String },
}

pub type Result<T> = std::result::Result<T, AtlasError>;
