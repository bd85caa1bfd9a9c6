use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain symbols for one file.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl LookupError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LookupError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        LookupError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors raised during a discovery pass.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Discovery root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Failed to walk {}: {message}", path.display())]
    Walk { path: PathBuf, message: String },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl DiscoveryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DiscoveryError::Io {
            path: path.into(),
            source,
        }
    }
}
