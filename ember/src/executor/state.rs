use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ring_buffer::TokenRingBuffer;
use crate::engine::Token;

/// Token-position bookkeeping for one executor instance. Exclusively owned by
/// the executor and passed by reference into each component operation.
#[derive(Debug)]
pub struct ExecutorState {
    /// Tokens already evaluated by the engine.
    pub past_tokens_count: usize,
    /// Tokens consumed from the queued input.
    pub consumed_tokens_count: usize,
    /// Cursor into `session_tokens` for prefix reuse.
    pub session_consumed_count: usize,
    /// Prefix-match length computed against the queued input.
    pub matching_session_tokens_count: usize,
    /// `None` means session caching is disabled.
    pub session_file_path: Option<PathBuf>,
    /// Tokens awaiting evaluation ("embd").
    pub pending_tokens: Vec<Token>,
    /// The full tokenized input ("embd_inps").
    pub queued_input_tokens: Vec<Token>,
    /// Tokens loaded from or destined for the session file.
    pub session_tokens: Vec<Token>,
    pub recent_tokens: TokenRingBuffer,
    pub mirostat_mu: Option<f32>,
}

impl ExecutorState {
    pub fn new(context_window: usize) -> Self {
        Self {
            past_tokens_count: 0,
            consumed_tokens_count: 0,
            session_consumed_count: 0,
            matching_session_tokens_count: 0,
            session_file_path: None,
            pending_tokens: Vec::new(),
            queued_input_tokens: Vec::new(),
            session_tokens: Vec::new(),
            recent_tokens: TokenRingBuffer::new(context_window),
            mirostat_mu: None,
        }
    }

    pub fn generation_started(&self) -> bool {
        self.past_tokens_count > 0 || !self.queued_input_tokens.is_empty()
    }

    pub fn snapshot(&self) -> ExecutorSnapshot {
        ExecutorSnapshot {
            past_tokens_count: self.past_tokens_count,
            consumed_tokens_count: self.consumed_tokens_count,
            session_consumed_count: self.session_consumed_count,
            matching_session_tokens_count: self.matching_session_tokens_count,
            session_file_path: self.session_file_path.clone(),
            pending_tokens: self.pending_tokens.clone(),
            queued_input_tokens: self.queued_input_tokens.clone(),
            session_tokens: self.session_tokens.clone(),
            recent_tokens: self.recent_tokens.to_vec(),
            recent_tokens_capacity: self.recent_tokens.capacity(),
            mirostat_mu: self.mirostat_mu,
        }
    }

    pub fn restore(
        &mut self,
        snapshot: ExecutorSnapshot,
    ) {
        self.past_tokens_count = snapshot.past_tokens_count;
        self.consumed_tokens_count = snapshot.consumed_tokens_count;
        self.session_consumed_count = snapshot.session_consumed_count;
        self.matching_session_tokens_count =
            snapshot.matching_session_tokens_count;
        self.session_file_path = snapshot.session_file_path;
        self.pending_tokens = snapshot.pending_tokens;
        self.queued_input_tokens = snapshot.queued_input_tokens;
        self.session_tokens = snapshot.session_tokens;
        self.recent_tokens = TokenRingBuffer::from_parts(
            snapshot.recent_tokens,
            snapshot.recent_tokens_capacity,
        );
        self.mirostat_mu = snapshot.mirostat_mu;
    }
}

/// Serializable image of [`ExecutorState`]. Round-trips exactly through
/// `snapshot`/`restore` and through the JSON state file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorSnapshot {
    pub past_tokens_count: usize,
    pub consumed_tokens_count: usize,
    pub session_consumed_count: usize,
    pub matching_session_tokens_count: usize,
    pub session_file_path: Option<PathBuf>,
    pub pending_tokens: Vec<Token>,
    pub queued_input_tokens: Vec<Token>,
    pub session_tokens: Vec<Token>,
    pub recent_tokens: Vec<Token>,
    pub recent_tokens_capacity: usize,
    pub mirostat_mu: Option<f32>,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::ExecutorState;

    #[test]
    fn test_snapshot_round_trip() {
        let mut state = ExecutorState::new(4);
        state.past_tokens_count = 3;
        state.consumed_tokens_count = 2;
        state.session_consumed_count = 1;
        state.matching_session_tokens_count = 1;
        state.session_file_path = Some(PathBuf::from("session.bin"));
        state.pending_tokens = vec![7];
        state.queued_input_tokens = vec![1, 2, 3];
        state.session_tokens = vec![1];
        state.recent_tokens.push(1);
        state.recent_tokens.push(2);
        state.mirostat_mu = Some(5.5);

        let snapshot = state.snapshot();
        let mut restored = ExecutorState::new(4);
        restored.restore(snapshot.clone());

        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.past_tokens_count, 3);
        assert_eq!(restored.recent_tokens.to_vec(), vec![1, 2]);
        assert_eq!(restored.mirostat_mu, Some(5.5));
    }
}
