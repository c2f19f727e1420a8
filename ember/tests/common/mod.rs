#![allow(dead_code)]

use std::{
    collections::VecDeque,
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use ember::{EngineError, ModelEngine, Token, Vocab};

/// Sampled by the stub once its script is exhausted.
pub const EOS: Token = 1_000_000;

/// One token per UTF-8 byte. Round-trips text exactly and lets tests split
/// multi-byte characters across tokens.
pub struct ByteVocab;

impl Vocab for ByteVocab {
    fn encode(
        &self,
        text: &str,
    ) -> Vec<Token> {
        text.bytes().map(|byte| byte as Token).collect()
    }

    fn token_bytes(
        &self,
        token: Token,
    ) -> Vec<u8> {
        if token <= u8::MAX as Token {
            vec![token as u8]
        } else {
            Vec::new()
        }
    }
}

pub fn text_tokens(text: &str) -> Vec<Token> {
    ByteVocab.encode(text)
}

/// Scripted engine stand-in: `sample` replays a fixed token sequence and
/// then EOS forever, `evaluate` records every call, and the session-file
/// primitive stores a little-endian count followed by 32-bit token ids.
pub struct StubEngine {
    context_window: usize,
    batch_size: usize,
    script: VecDeque<Token>,
    eval_log: Arc<Mutex<Vec<(Vec<Token>, usize)>>>,
    fail_session_load: bool,
    fail_evaluate: bool,
}

impl StubEngine {
    pub fn new(context_window: usize) -> Self {
        Self {
            context_window,
            batch_size: 8,
            script: VecDeque::new(),
            eval_log: Arc::new(Mutex::new(Vec::new())),
            fail_session_load: false,
            fail_evaluate: false,
        }
    }

    pub fn with_script(
        mut self,
        text: &str,
    ) -> Self {
        self.script = text_tokens(text).into();
        self
    }

    pub fn with_batch_size(
        mut self,
        batch_size: usize,
    ) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_failing_session_load(mut self) -> Self {
        self.fail_session_load = true;
        self
    }

    pub fn with_failing_evaluate(mut self) -> Self {
        self.fail_evaluate = true;
        self
    }

    pub fn eval_log(&self) -> Arc<Mutex<Vec<(Vec<Token>, usize)>>> {
        Arc::clone(&self.eval_log)
    }
}

impl ModelEngine for StubEngine {
    fn context_window(&self) -> usize {
        self.context_window
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn evaluate(
        &mut self,
        tokens: &[Token],
        past_tokens_count: usize,
    ) -> Result<usize, EngineError> {
        if self.fail_evaluate {
            return Err(EngineError::Evaluation(String::from(
                "scripted failure",
            )));
        }
        self.eval_log
            .lock()
            .unwrap()
            .push((tokens.to_vec(), past_tokens_count));
        Ok(past_tokens_count + tokens.len())
    }

    fn sample(
        &mut self,
        _recent_tokens: &[Token],
        mirostat_mu: &mut Option<f32>,
    ) -> Token {
        // Mimics an adaptive sampler carrying mu across steps.
        *mirostat_mu = Some(mirostat_mu.unwrap_or(10.0) - 0.25);
        self.script.pop_front().unwrap_or(EOS)
    }

    fn eos_token(&self) -> Token {
        EOS
    }

    fn load_session(
        &mut self,
        path: &Path,
        max_tokens: usize,
    ) -> Result<Vec<Token>, EngineError> {
        if self.fail_session_load {
            return Err(EngineError::Session(String::from(
                "container magic mismatch",
            )));
        }

        let bytes = fs::read(path)?;
        if bytes.len() < 8 {
            return Err(EngineError::Session(String::from("truncated header")));
        }
        let count =
            u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
        if bytes.len() != 8 + count * 4 {
            return Err(EngineError::Session(String::from(
                "token record size mismatch",
            )));
        }

        Ok(bytes[8..]
            .chunks_exact(4)
            .map(|chunk| {
                u32::from_le_bytes(chunk.try_into().unwrap()) as Token
            })
            .take(max_tokens)
            .collect())
    }

    fn save_session(
        &mut self,
        path: &Path,
        tokens: &[Token],
    ) -> Result<(), EngineError> {
        let mut bytes = Vec::with_capacity(8 + tokens.len() * 4);
        bytes.extend_from_slice(&(tokens.len() as u64).to_le_bytes());
        for &token in tokens {
            bytes.extend_from_slice(&(token as u32).to_le_bytes());
        }
        fs::write(path, bytes)?;
        Ok(())
    }
}
