use std::path::Path;

use tracing::{info, warn};

use super::error::ExecutorError;
use crate::engine::{ModelEngine, Token};

/// Diagnostic banding of a prefix match. Has no behavioral effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchQuality {
    Exact,
    Partial,
    Low,
}

/// Loads the session token record behind `path`. A missing file is a
/// cache-miss, not an error; a file the engine cannot load is fatal for the
/// call and names the offending path.
pub fn load(
    engine: &mut dyn ModelEngine,
    path: &Path,
) -> Result<Vec<Token>, ExecutorError> {
    if !path.exists() {
        warn!(path = %path.display(), "session file does not exist, will create");
        return Ok(Vec::new());
    }

    info!(path = %path.display(), "attempting to load saved session");
    let capacity = engine.context_window();
    let mut tokens = engine.load_session(path, capacity).map_err(|source| {
        ExecutorError::SessionLoad {
            path: path.to_path_buf(),
            source,
        }
    })?;
    tokens.truncate(capacity);
    info!(tokens = tokens.len(), "loaded session");
    Ok(tokens)
}

/// Longest leading run of identical tokens between the cached session and
/// the queued input.
pub fn prefix_match(
    session_tokens: &[Token],
    queued_input_tokens: &[Token],
) -> usize {
    session_tokens
        .iter()
        .zip(queued_input_tokens)
        .take_while(|(session, queued)| session == queued)
        .count()
}

pub fn classify_match(
    match_length: usize,
    queued_length: usize,
) -> MatchQuality {
    if match_length == queued_length {
        MatchQuality::Exact
    } else if match_length < queued_length / 2 {
        MatchQuality::Low
    } else {
        MatchQuality::Partial
    }
}

pub fn save(
    engine: &mut dyn ModelEngine,
    path: &Path,
    tokens: &[Token],
) -> Result<(), ExecutorError> {
    engine.save_session(path, tokens).map_err(|source| {
        ExecutorError::SessionSave {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{MatchQuality, classify_match, prefix_match};

    #[test]
    fn test_prefix_match_empty_session() {
        assert_eq!(prefix_match(&[], &[1, 2, 3]), 0);
    }

    #[test]
    fn test_prefix_match_stops_at_first_mismatch() {
        assert_eq!(prefix_match(&[1, 2, 9, 4], &[1, 2, 3, 4]), 2);
    }

    #[test]
    fn test_prefix_match_bounded_by_shorter_sequence() {
        assert_eq!(prefix_match(&[1, 2], &[1, 2, 3, 4]), 2);
        assert_eq!(prefix_match(&[1, 2, 3, 4], &[1, 2]), 2);
    }

    #[test]
    fn test_classify_match_bands() {
        assert_eq!(classify_match(4, 4), MatchQuality::Exact);
        assert_eq!(classify_match(1, 4), MatchQuality::Low);
        assert_eq!(classify_match(2, 4), MatchQuality::Partial);
        assert_eq!(classify_match(3, 4), MatchQuality::Partial);
    }
}
