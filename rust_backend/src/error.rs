//! Error types for tiling and scheduling operations.

/// Result type for tiling operations
pub type TilingResult<T> = Result<T, TilingError>;

/// Error type for tiling operations.
///
/// Map and resolution errors abort a run before any tile is built. Candidate
/// errors are local to one catalog row and are skipped by the scheduler.
/// Horizon errors stop the run but keep the tiles accepted so far. Alert errors
/// are logged and swallowed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TilingError {
    #[error("Skymap format error: {0}")]
    MapFormat(String),

    #[error("Invalid skymap resolution: {0}")]
    InvalidResolution(String),

    #[error("Candidate data error: {0}")]
    CandidateData(String),

    #[error("Horizon service error: {0}")]
    HorizonService(String),

    #[error("Alert delivery error: {0}")]
    AlertDelivery(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TilingError {
    /// Returns `true` for errors that must stop the run rather than skip one row.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            TilingError::CandidateData(_) | TilingError::AlertDelivery(_)
        )
    }
}

impl From<String> for TilingError {
    fn from(s: String) -> Self {
        TilingError::Internal(s)
    }
}

impl From<&str> for TilingError {
    fn from(s: &str) -> Self {
        TilingError::Internal(s.to_string())
    }
}

impl From<std::io::Error> for TilingError {
    fn from(e: std::io::Error) -> Self {
        TilingError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(TilingError::MapFormat("bad".into()).is_fatal());
        assert!(TilingError::HorizonService("down".into()).is_fatal());
        assert!(!TilingError::CandidateData("nan".into()).is_fatal());
        assert!(!TilingError::AlertDelivery("closed".into()).is_fatal());
    }

    #[test]
    fn test_display_carries_context() {
        let err = TilingError::InvalidResolution("npix=13".to_string());
        assert_eq!(err.to_string(), "Invalid skymap resolution: npix=13");
    }
}
