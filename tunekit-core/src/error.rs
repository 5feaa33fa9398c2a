//! Error types for the tunekit-core crate.

use thiserror::Error;
use tunekit_bridge::BridgeError;

/// Top-level error type for training and merge runs.
#[derive(Debug, Error)]
pub enum TuneError {
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported {library} {found}: tunekit requires >= {minimum}")]
    UnsupportedLibrary {
        library: &'static str,
        found: semver::Version,
        minimum: semver::Version,
    },

    #[error("Invalid version for {library}: {value}")]
    Version { library: &'static str, value: String },

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Configuration file error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl TuneError {
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn adapter(msg: impl Into<String>) -> Self {
        Self::Adapter(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Python traceback when the failure came from a worker-side exception.
    pub fn traceback(&self) -> Option<&str> {
        match self {
            Self::Bridge(e) => e.traceback(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_library_display() {
        let err = TuneError::UnsupportedLibrary {
            library: "trl",
            found: semver::Version::new(0, 7, 4),
            minimum: semver::Version::new(0, 9, 0),
        };
        assert_eq!(err.to_string(), "Unsupported trl 0.7.4: tunekit requires >= 0.9.0");
    }

    #[test]
    fn test_bridge_error_is_transparent() {
        let err: TuneError = BridgeError::Closed {
            method: "trainer.train".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Worker closed the connection while waiting for 'trainer.train'"
        );
        assert!(err.traceback().is_none());
    }
}
