pub mod cancel;
pub use cancel::CancelToken;

pub mod decoder;
pub use decoder::StreamingTokenDecoder;

pub mod engine;
pub use engine::{EngineError, ModelEngine, Token};

pub mod executor;
pub use executor::{
    error::ExecutorError,
    executor::{Executor, Generation},
    params::{GenerationParams, InferLoopState},
    ring_buffer::TokenRingBuffer,
    state::{ExecutorSnapshot, ExecutorState},
    strategy::{CompletionStrategy, InferenceStrategy, InstructStrategy},
};

pub mod vocab;
pub use vocab::{HfVocab, Vocab, VocabError};
