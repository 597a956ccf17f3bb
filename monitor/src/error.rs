//! Error types for the monitor
//!
//! Only configuration errors abort an update check. Catalog and tool failures
//! are folded into diagnostics on the check result.

use std::path::PathBuf;
use std::time::Duration;

/// Required input missing or unreadable
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing ini file: {0}")]
    MissingIni(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Catalog (published file details) request failures
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure or a body that does not decode as catalog JSON
    #[error("Catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Catalog returned HTTP {0}")]
    Status(u16),
}

/// External inventory tool failures
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("steamcmd not found: {0}")]
    NotFound(PathBuf),

    #[error("steamcmd failed: {0}")]
    Spawn(std::io::Error),

    #[error("steamcmd timed out after {0:?}")]
    Timeout(Duration),

    #[error("buildid not found in steamcmd output")]
    BuildIdMissing,
}
