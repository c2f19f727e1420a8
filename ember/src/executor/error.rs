use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("session file path is empty")]
    EmptySessionPath,
    #[error("a session file can only be attached before the first generation")]
    SessionAttachedAfterStart,
    #[error("failed to load session file {path:?}: {source}")]
    SessionLoad {
        path: PathBuf,
        source: EngineError,
    },
    #[error("failed to save session file {path:?}: {source}")]
    SessionSave {
        path: PathBuf,
        source: EngineError,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to serialize executor state: {0}")]
    StateSerialization(#[from] serde_json::Error),
    #[error("failed to access state file {path:?}: {source}")]
    StateFile {
        path: PathBuf,
        source: std::io::Error,
    },
}
