use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Error probing {path:?}: {msg}")]
pub struct ProbeError {
    path: PathBuf,
    msg: String,
}

impl ProbeError {
    pub fn for_file(path: &Path, msg: &str) -> Self {
        ProbeError {
            path: PathBuf::from(path),
            msg: String::from(msg),
        }
    }
}

/// Failure of an external tool invocation (encoder or metadata sync).
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unable to execute {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed on {path:?}: {msg}")]
    Failed {
        tool: String,
        path: PathBuf,
        msg: String,
    },

    #[error("{tool} was interrupted while processing {path:?}")]
    Interrupted { tool: String, path: PathBuf },
}

impl ToolError {
    pub fn spawn(tool: &str, source: std::io::Error) -> Self {
        ToolError::Spawn { tool: String::from(tool), source }
    }

    pub fn failed(tool: &str, path: &Path, msg: &str) -> Self {
        ToolError::Failed {
            tool: String::from(tool),
            path: PathBuf::from(path),
            msg: String::from(msg),
        }
    }

    pub fn interrupted(tool: &str, path: &Path) -> Self {
        ToolError::Interrupted {
            tool: String::from(tool),
            path: PathBuf::from(path),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, ToolError::Interrupted { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("no media files found under {0:?}")]
    NoMediaFiles(PathBuf),
}
