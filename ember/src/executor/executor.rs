use std::{
    collections::VecDeque,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
    sync::Arc,
};

use super::{
    context::ExecutorContext,
    error::ExecutorError,
    params::{GenerationParams, InferLoopState},
    session_cache,
    state::{ExecutorSnapshot, ExecutorState},
    strategy::{CompletionStrategy, InferenceStrategy, InstructStrategy},
};
use crate::{
    cancel::CancelToken, decoder::StreamingTokenDecoder, engine::ModelEngine,
    vocab::Vocab,
};

/// Stateful inference loop controller. Owns the engine, the token-position
/// bookkeeping, and the active strategy; one instance drives one logical
/// conversation with the model.
pub struct Executor {
    ctx: ExecutorContext,
    strategy: Box<dyn InferenceStrategy>,
    decoder: StreamingTokenDecoder,
}

impl Executor {
    pub fn new(
        engine: Box<dyn ModelEngine>,
        vocab: Arc<dyn Vocab>,
        strategy: Box<dyn InferenceStrategy>,
    ) -> Self {
        let decoder = StreamingTokenDecoder::new(Arc::clone(&vocab));
        Self {
            ctx: ExecutorContext::new(engine, vocab),
            strategy,
            decoder,
        }
    }

    pub fn completion(
        engine: Box<dyn ModelEngine>,
        vocab: Arc<dyn Vocab>,
    ) -> Self {
        Self::new(engine, vocab, Box::new(CompletionStrategy::default()))
    }

    pub fn instruct(
        engine: Box<dyn ModelEngine>,
        vocab: Arc<dyn Vocab>,
    ) -> Self {
        Self::new(engine, vocab, Box::new(InstructStrategy::new()))
    }

    pub fn state(&self) -> &ExecutorState {
        &self.ctx.state
    }

    /// Attaches a session cache file and loads its token record. Idempotent
    /// for the already attached path; otherwise only valid before the first
    /// generation, so a window-recovery cache disable can never be undone.
    pub fn attach_session_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<&mut Self, ExecutorError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ExecutorError::EmptySessionPath);
        }
        if self.ctx.state.session_file_path.as_deref() == Some(path) {
            return Ok(self);
        }
        if self.ctx.state.generation_started() {
            return Err(ExecutorError::SessionAttachedAfterStart);
        }

        let tokens = session_cache::load(self.ctx.engine.as_mut(), path)?;
        self.ctx.state.session_tokens = tokens;
        self.ctx.state.session_consumed_count = 0;
        self.ctx.state.matching_session_tokens_count = 0;
        self.ctx.state.session_file_path = Some(path.to_path_buf());
        Ok(self)
    }

    /// Writes the current session token record to `path`. Best-effort; the
    /// file on disk may be lost if the process crashes mid-save.
    pub fn persist_session_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<(), ExecutorError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ExecutorError::EmptySessionPath);
        }
        session_cache::save(
            self.ctx.engine.as_mut(),
            path,
            &self.ctx.state.session_tokens,
        )
    }

    /// Starts a generation call and returns the lazy chunk stream. The
    /// stream polls `cancel` once per pull; cancellation ends it without an
    /// error item.
    pub fn run(
        &mut self,
        text: &str,
        params: GenerationParams,
        cancel: CancelToken,
    ) -> Result<Generation<'_>, ExecutorError> {
        let mut loop_state = InferLoopState::for_params(&params);
        self.strategy.preprocess(&mut self.ctx, text, &params, &mut loop_state)?;

        Ok(Generation {
            executor: self,
            params,
            loop_state,
            cancel,
            queued: VecDeque::new(),
            done: false,
        })
    }

    /// Warms the engine cache with `prompt` without generating anything: the
    /// first step moves the tokenized input into the pending buffer, the
    /// second drives the engine fully up to date.
    pub fn prefill(
        &mut self,
        prompt: &str,
    ) -> Result<(), ExecutorError> {
        let params = GenerationParams {
            max_tokens: 0,
            ..GenerationParams::default()
        };
        let mut loop_state = InferLoopState::for_prefill();

        self.strategy.preprocess(
            &mut self.ctx,
            prompt,
            &params,
            &mut loop_state,
        )?;
        self.strategy.step(&mut self.ctx, &params, &mut loop_state)?;
        self.strategy.step(&mut self.ctx, &params, &mut loop_state)?;
        Ok(())
    }

    pub fn snapshot(&self) -> ExecutorSnapshot {
        self.ctx.state.snapshot()
    }

    pub fn restore(
        &mut self,
        snapshot: ExecutorSnapshot,
    ) {
        self.ctx.state.restore(snapshot);
    }

    pub fn save_state(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(), ExecutorError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| {
            ExecutorError::StateFile {
                path: path.to_path_buf(),
                source,
            }
        })?;
        serde_json::to_writer(BufWriter::new(file), &self.snapshot())?;
        Ok(())
    }

    pub fn load_state(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<(), ExecutorError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| {
            ExecutorError::StateFile {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let snapshot: ExecutorSnapshot =
            serde_json::from_reader(BufReader::new(file))?;
        self.restore(snapshot);
        Ok(())
    }
}

/// Lazy, cancellable sequence of generated text chunks. Each pull runs whole
/// loop iterations until a chunk is available or the loop terminates; the
/// suspension point between pulls is the engine evaluation.
pub struct Generation<'a> {
    executor: &'a mut Executor,
    params: GenerationParams,
    loop_state: InferLoopState,
    cancel: CancelToken,
    queued: VecDeque<String>,
    done: bool,
}

impl Iterator for Generation<'_> {
    type Item = Result<String, ExecutorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cancel.is_cancelled() {
            self.done = true;
            return None;
        }

        if let Some(chunk) = self.queued.pop_front() {
            return Some(Ok(chunk));
        }

        while !self.done {
            // Once per iteration; an in-flight evaluation is never cut short.
            if self.cancel.is_cancelled() {
                self.done = true;
                return None;
            }

            if !self
                .executor
                .strategy
                .should_continue(&self.executor.ctx, &self.loop_state)
            {
                self.done = true;
                break;
            }

            if let Err(error) = self.executor.strategy.step(
                &mut self.executor.ctx,
                &self.params,
                &mut self.loop_state,
            ) {
                self.done = true;
                return Some(Err(error));
            }

            if self.loop_state.return_value {
                self.executor
                    .decoder
                    .push_all(&self.executor.ctx.state.pending_tokens);
                let text = self.executor.decoder.read();
                if !text.is_empty() {
                    self.queued.push_back(text);
                }
            }

            match self.executor.strategy.post_process(
                &mut self.executor.ctx,
                &self.params,
                &mut self.loop_state,
            ) {
                Ok((stop, extra_chunks)) => {
                    self.queued.extend(extra_chunks);
                    if stop {
                        self.done = true;
                    }
                },
                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                },
            }

            if let Some(chunk) = self.queued.pop_front() {
                return Some(Ok(chunk));
            }
        }

        self.queued.pop_front().map(Ok)
    }
}
