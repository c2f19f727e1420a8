use tracing::debug;

use super::state::ExecutorState;

/// Recovers from context-window exhaustion by truncating the evaluated
/// window and re-queuing roughly half of the discarded recent tokens for
/// re-evaluation. Never fails; permanently disables session caching for this
/// executor instance, since the cache no longer aligns with token positions.
///
/// The re-queue slice start is clamped into `[0, keep_end]` with saturating
/// arithmetic, where `keep_end` excludes tokens still pending evaluation, so
/// degenerate windows re-queue a short or empty slice instead of panicking.
pub fn recover(
    state: &mut ExecutorState,
    context_window: usize,
    tokens_to_keep: usize,
) {
    let n_left = state.past_tokens_count.saturating_sub(tokens_to_keep);
    state.past_tokens_count = tokens_to_keep.min(context_window).max(1);

    let recent = state.recent_tokens.to_vec();
    let pending_len = state.pending_tokens.len();
    let keep_end = recent.len().saturating_sub(pending_len);
    let start = context_window
        .saturating_sub(n_left / 2)
        .saturating_sub(pending_len)
        .min(keep_end);

    state.pending_tokens.splice(0..0, recent[start..keep_end].iter().copied());

    // Token positions past the truncation point no longer line up with the
    // cached session.
    state.session_file_path = None;

    debug!(
        n_left,
        requeued = keep_end - start,
        past_tokens_count = state.past_tokens_count,
        "context window exhausted, re-queuing recent tokens"
    );
}
