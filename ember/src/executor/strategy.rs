use tracing::{info, warn};

use super::{
    context::ExecutorContext,
    context_window,
    error::ExecutorError,
    params::{GenerationParams, InferLoopState},
    prefix_reuse,
    session_cache::{self, MatchQuality},
};

/// The four per-call hooks that differ between executor flavors. The loop
/// controller drives whichever implementation it holds; the components
/// (session cache, window recovery, prefix reuse) are shared.
pub trait InferenceStrategy: Send {
    fn preprocess(
        &mut self,
        ctx: &mut ExecutorContext,
        text: &str,
        params: &GenerationParams,
        loop_state: &mut InferLoopState,
    ) -> Result<(), ExecutorError>;

    fn should_continue(
        &mut self,
        ctx: &ExecutorContext,
        loop_state: &InferLoopState,
    ) -> bool;

    /// One unit of work: evaluate pending tokens (recovering the window and
    /// reusing the session prefix first), then either sample one new token or
    /// move more queued input into the pending buffer.
    fn step(
        &mut self,
        ctx: &mut ExecutorContext,
        params: &GenerationParams,
        loop_state: &mut InferLoopState,
    ) -> Result<(), ExecutorError>;

    fn post_process(
        &mut self,
        ctx: &mut ExecutorContext,
        params: &GenerationParams,
        loop_state: &mut InferLoopState,
    ) -> Result<(bool, Vec<String>), ExecutorError>;
}

/// Rolling byte window over generated text, capped at twice the longest stop
/// string. Prompt text is never fed here, so a stop string inside the prompt
/// cannot end generation.
pub struct AntipromptScanner {
    stops: Vec<Vec<u8>>,
    window: Vec<u8>,
    window_cap: usize,
    triggered: bool,
}

impl AntipromptScanner {
    pub fn new(stops: &[String]) -> Self {
        let stops: Vec<Vec<u8>> = stops
            .iter()
            .filter(|stop| !stop.is_empty())
            .map(|stop| stop.clone().into_bytes())
            .collect();
        let longest = stops.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            stops,
            window: Vec::new(),
            window_cap: longest * 2,
            triggered: false,
        }
    }

    pub fn push_bytes(
        &mut self,
        bytes: &[u8],
    ) {
        if self.stops.is_empty() || self.triggered {
            return;
        }

        self.window.extend_from_slice(bytes);
        if self.window.len() > self.window_cap {
            let excess = self.window.len() - self.window_cap;
            self.window.drain(..excess);
        }

        if self.stops.iter().any(|stop| contains(&self.window, stop)) {
            self.triggered = true;
        }
    }

    pub fn triggered(&self) -> bool {
        self.triggered
    }
}

fn contains(
    haystack: &[u8],
    needle: &[u8],
) -> bool {
    haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}

/// Single-turn text completion. Runs until the token budget is exhausted, an
/// antiprompt appears in the generated text, or the engine samples EOS.
#[derive(Default)]
pub struct CompletionStrategy {
    scanner: Option<AntipromptScanner>,
}

impl InferenceStrategy for CompletionStrategy {
    fn preprocess(
        &mut self,
        ctx: &mut ExecutorContext,
        text: &str,
        _params: &GenerationParams,
        loop_state: &mut InferLoopState,
    ) -> Result<(), ExecutorError> {
        let tokens = ctx.vocab.encode(text);
        ctx.state.queued_input_tokens.extend(tokens);

        if ctx.state.session_file_path.is_some()
            && !ctx.state.session_tokens.is_empty()
        {
            let matched = session_cache::prefix_match(
                &ctx.state.session_tokens,
                &ctx.state.queued_input_tokens,
            );
            ctx.state.matching_session_tokens_count = matched;

            let queued = ctx.state.queued_input_tokens.len();
            match session_cache::classify_match(matched, queued) {
                MatchQuality::Exact => {
                    info!("session file has exact match for prompt");
                },
                MatchQuality::Low => {
                    warn!(
                        matched,
                        queued,
                        "session file has low similarity to prompt; \
                         will mostly be re-evaluated"
                    );
                },
                MatchQuality::Partial => {
                    info!(matched, queued, "session file matches a prompt prefix");
                },
            }
        }

        loop_state.need_session_save = ctx.state.session_file_path.is_some()
            && ctx.state.matching_session_tokens_count
                < ctx.state.queued_input_tokens.len();

        self.scanner = Some(AntipromptScanner::new(&loop_state.antiprompts));
        Ok(())
    }

    fn should_continue(
        &mut self,
        _ctx: &ExecutorContext,
        loop_state: &InferLoopState,
    ) -> bool {
        loop_state.remaining_tokens != 0 && !loop_state.wait_for_input
    }

    fn step(
        &mut self,
        ctx: &mut ExecutorContext,
        params: &GenerationParams,
        loop_state: &mut InferLoopState,
    ) -> Result<(), ExecutorError> {
        let ExecutorContext {
            engine,
            vocab: _,
            state,
        } = ctx;
        let context_window = engine.context_window();
        let batch_size = engine.batch_size();

        if !state.pending_tokens.is_empty() {
            if state.past_tokens_count + state.pending_tokens.len()
                > context_window
            {
                context_window::recover(
                    state,
                    context_window,
                    params.tokens_to_keep,
                );
            }

            prefix_reuse::reuse_matching_prefix(state);

            if !state.pending_tokens.is_empty() {
                state.past_tokens_count = engine
                    .evaluate(&state.pending_tokens, state.past_tokens_count)?;

                if state.session_file_path.is_some() {
                    state.session_tokens.extend_from_slice(&state.pending_tokens);
                    state.session_consumed_count = state.session_tokens.len();
                }
            }
            state.pending_tokens.clear();
        }

        if state.queued_input_tokens.len() <= state.consumed_tokens_count
            && !loop_state.wait_for_input
        {
            // Persist the session once the whole prompt has been evaluated,
            // before generation extends it further.
            if loop_state.need_session_save {
                loop_state.need_session_save = false;
                if let Some(path) = state.session_file_path.clone() {
                    session_cache::save(
                        engine.as_mut(),
                        &path,
                        &state.session_tokens,
                    )?;
                }
            }

            let token = engine
                .sample(state.recent_tokens.as_slice(), &mut state.mirostat_mu);
            state.recent_tokens.push(token);
            state.pending_tokens.push(token);
            loop_state.remaining_tokens -= 1;
            loop_state.return_value = true;
        } else {
            while state.queued_input_tokens.len() > state.consumed_tokens_count
            {
                let token =
                    state.queued_input_tokens[state.consumed_tokens_count];
                state.pending_tokens.push(token);
                state.recent_tokens.push(token);
                state.consumed_tokens_count += 1;
                if state.pending_tokens.len() >= batch_size {
                    break;
                }
            }
            loop_state.return_value = false;
        }

        Ok(())
    }

    fn post_process(
        &mut self,
        ctx: &mut ExecutorContext,
        _params: &GenerationParams,
        loop_state: &mut InferLoopState,
    ) -> Result<(bool, Vec<String>), ExecutorError> {
        let ExecutorContext {
            engine,
            vocab,
            state,
        } = ctx;

        if loop_state.return_value {
            if let Some(scanner) = self.scanner.as_mut() {
                if let Some(&token) = state.pending_tokens.last() {
                    scanner.push_bytes(&vocab.token_bytes(token));
                }
            }
        }

        if state.queued_input_tokens.len() <= state.consumed_tokens_count {
            let triggered =
                self.scanner.as_ref().is_some_and(AntipromptScanner::triggered);
            if triggered {
                loop_state.wait_for_input = true;
            }
            if state.past_tokens_count > 0 && loop_state.wait_for_input {
                return Ok((true, Vec::new()));
            }
        }

        if loop_state.return_value
            && state.pending_tokens.last() == Some(&engine.eos_token())
        {
            return Ok((true, vec![String::from(" [end of text]")]));
        }

        Ok((false, Vec::new()))
    }
}

/// Instruction-following flavor: wraps every input in instruction/response
/// markers and treats the instruction marker itself as a stop trigger, so
/// the model handing control back ends the call. Everything else behaves
/// like plain completion.
pub struct InstructStrategy {
    inner: CompletionStrategy,
    instruction_prefix: String,
    instruction_suffix: String,
}

impl InstructStrategy {
    pub fn new() -> Self {
        Self::with_markers("### Instruction:\n", "\n### Response:\n")
    }

    pub fn with_markers(
        instruction_prefix: &str,
        instruction_suffix: &str,
    ) -> Self {
        Self {
            inner: CompletionStrategy::default(),
            instruction_prefix: instruction_prefix.to_string(),
            instruction_suffix: instruction_suffix.to_string(),
        }
    }
}

impl Default for InstructStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceStrategy for InstructStrategy {
    fn preprocess(
        &mut self,
        ctx: &mut ExecutorContext,
        text: &str,
        params: &GenerationParams,
        loop_state: &mut InferLoopState,
    ) -> Result<(), ExecutorError> {
        let wrapped = format!(
            "{}{}{}",
            self.instruction_prefix, text, self.instruction_suffix
        );

        let marker = self.instruction_prefix.trim();
        if !marker.is_empty()
            && !loop_state.antiprompts.iter().any(|stop| stop == marker)
        {
            loop_state.antiprompts.push(marker.to_string());
        }

        self.inner.preprocess(ctx, &wrapped, params, loop_state)
    }

    fn should_continue(
        &mut self,
        ctx: &ExecutorContext,
        loop_state: &InferLoopState,
    ) -> bool {
        self.inner.should_continue(ctx, loop_state)
    }

    fn step(
        &mut self,
        ctx: &mut ExecutorContext,
        params: &GenerationParams,
        loop_state: &mut InferLoopState,
    ) -> Result<(), ExecutorError> {
        self.inner.step(ctx, params, loop_state)
    }

    fn post_process(
        &mut self,
        ctx: &mut ExecutorContext,
        params: &GenerationParams,
        loop_state: &mut InferLoopState,
    ) -> Result<(bool, Vec<String>), ExecutorError> {
        self.inner.post_process(ctx, params, loop_state)
    }
}
