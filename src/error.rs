use crate::parser::ParsingError;
use crate::tracking::TrackingError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole run.
///
/// Problems with single candidate files or time points never show up here;
/// they are recorded in the run's results instead.
#[derive(Debug, Error)]
pub enum RsmlTrackError {
    #[error("cannot read candidate directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parsing(#[from] ParsingError),
    #[error(transparent)]
    Tracking(#[from] TrackingError),
}

pub type Result<T> = std::result::Result<T, RsmlTrackError>;
