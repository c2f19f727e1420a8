use std::path::Path;

use thiserror::Error;

pub type Token = u64;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("model evaluation failed: {0}")]
    Evaluation(String),
    #[error("session file rejected by the engine: {0}")]
    Session(String),
    #[error("failed to access session file: {0}")]
    SessionIo(#[from] std::io::Error),
}

/// Boundary to the forward-pass/decode engine. The executor treats the engine
/// as opaque: evaluating tokens advances its internal cache by a count, and
/// the session-file primitive is expected to persist and restore whatever
/// engine-internal state the container holds alongside the token record.
pub trait ModelEngine: Send {
    fn context_window(&self) -> usize;

    fn batch_size(&self) -> usize;

    /// Consumes `tokens` starting at position `past_tokens_count` and returns
    /// the new past-token count.
    fn evaluate(
        &mut self,
        tokens: &[Token],
        past_tokens_count: usize,
    ) -> Result<usize, EngineError>;

    /// Samples the next token. `mirostat_mu` is carried across calls by the
    /// executor and is otherwise opaque to it.
    fn sample(
        &mut self,
        recent_tokens: &[Token],
        mirostat_mu: &mut Option<f32>,
    ) -> Token;

    fn eos_token(&self) -> Token;

    /// Loads a previously saved session container. Only called on paths that
    /// exist on disk; returns at most `max_tokens` tokens.
    fn load_session(
        &mut self,
        path: &Path,
        max_tokens: usize,
    ) -> Result<Vec<Token>, EngineError>;

    /// Overwrites `path` with the given token record. Best-effort; there is
    /// no partial-write recovery.
    fn save_session(
        &mut self,
        path: &Path,
        tokens: &[Token],
    ) -> Result<(), EngineError>;
}
