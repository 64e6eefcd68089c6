//! Error type shared by the storage, import, export and service layers.
//!
//! The geometric core never fails: bad geometry and missing matches come back
//! as empty results. Errors here cover caller mistakes (an unknown track id)
//! and the outer surfaces (files, JSON payloads, HTTP).

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, AnnotatorError>;

#[derive(Error, Debug)]
pub enum AnnotatorError {
    #[error("track {0} not found")]
    TrackNotFound(String),
    #[error("input file not found: {0}")]
    MissingInput(String),
    #[error("csv")]
    Csv(#[from] csv::Error),
    #[error("io")]
    Io(#[from] std::io::Error),
    #[error("json")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "http")]
    #[error("reqwest")]
    Reqwest(#[from] reqwest::Error),
    #[error("{service} returned HTTP {status}")]
    Service { service: &'static str, status: u16 },
    #[error("{service}: max retries exceeded")]
    RetriesExhausted { service: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnnotatorError::TrackNotFound("hike-7".to_string());
        assert!(err.to_string().contains("hike-7"));

        let err = AnnotatorError::Service { service: "overpass", status: 504 };
        assert_eq!(err.to_string(), "overpass returned HTTP 504");
    }

    #[test]
    fn test_from_json_error() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: AnnotatorError = parse.unwrap_err().into();
        assert!(matches!(err, AnnotatorError::Json(_)));
    }
}
