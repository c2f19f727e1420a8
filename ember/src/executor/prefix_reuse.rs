use super::state::ExecutorState;

/// Advances the session cursor through tokens that the cached session
/// already covers, so they are not re-sent to the engine. On the first
/// mismatch the session is truncated at the cursor; it is never extended
/// here. Assumes the engine's internal cache was restored consistently with
/// the session tokens, which is the caller's contract.
pub fn reuse_matching_prefix(state: &mut ExecutorState) {
    if state.session_consumed_count >= state.session_tokens.len() {
        return;
    }

    let mut matched = 0;
    while matched < state.pending_tokens.len() {
        if state.pending_tokens[matched]
            != state.session_tokens[state.session_consumed_count]
        {
            state.session_tokens.truncate(state.session_consumed_count);
            break;
        }

        state.past_tokens_count += 1;
        state.session_consumed_count += 1;
        matched += 1;

        if state.session_consumed_count >= state.session_tokens.len() {
            break;
        }
    }

    state.pending_tokens.drain(..matched);
}
