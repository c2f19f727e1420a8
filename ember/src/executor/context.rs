use std::sync::Arc;

use super::state::ExecutorState;
use crate::{engine::ModelEngine, vocab::Vocab};

/// Everything a strategy hook operates on: the opaque engine, the
/// tokenization boundary, and the executor's bookkeeping.
pub struct ExecutorContext {
    pub engine: Box<dyn ModelEngine>,
    pub vocab: Arc<dyn Vocab>,
    pub state: ExecutorState,
}

impl ExecutorContext {
    pub fn new(
        engine: Box<dyn ModelEngine>,
        vocab: Arc<dyn Vocab>,
    ) -> Self {
        let context_window = engine.context_window();
        Self {
            engine,
            vocab,
            state: ExecutorState::new(context_window),
        }
    }

    pub fn context_window(&self) -> usize {
        self.engine.context_window()
    }
}
