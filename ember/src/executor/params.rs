/// Per-call generation options.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Stop strings; generation halts once produced text contains one.
    pub antiprompts: Vec<String>,
    /// Generation budget. 0 produces nothing; negative means unbounded.
    pub max_tokens: i32,
    /// Leading prompt tokens that context-window recovery never discards.
    pub tokens_to_keep: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            antiprompts: Vec::new(),
            max_tokens: -1,
            tokens_to_keep: 0,
        }
    }
}

/// Ephemeral state of one generation call.
#[derive(Debug, Clone)]
pub struct InferLoopState {
    pub antiprompts: Vec<String>,
    pub remaining_tokens: i32,
    /// Whether the last step produced output.
    pub return_value: bool,
    pub wait_for_input: bool,
    pub need_session_save: bool,
}

impl InferLoopState {
    pub fn for_params(params: &GenerationParams) -> Self {
        Self {
            antiprompts: params.antiprompts.clone(),
            remaining_tokens: params.max_tokens,
            return_value: false,
            wait_for_input: false,
            need_session_save: false,
        }
    }

    pub fn for_prefill() -> Self {
        Self {
            antiprompts: Vec::new(),
            remaining_tokens: 0,
            return_value: false,
            wait_for_input: true,
            need_session_save: false,
        }
    }
}
