use super::{Command, Outcome, ReadFault, queue};
use crate::config::ReaderConfig;
use crate::model::reading_state::ReadingState;
use crate::state::SessionPhase;

/// 阅读中遇到 404 页面
///
/// 重试次数只在这里增加，只有整体重置才会清零；超过上限时重置状态并停止，
/// 不再跳转。点赞计数不受影响。
pub fn handle_error_page(state: &mut ReadingState, config: &ReaderConfig) -> Outcome {
    state.error_retries = state.error_retries.saturating_add(1);

    if state.error_retries > config.max_retries {
        log::warn!(
            "Error page seen {} times (limit {}), resetting",
            state.error_retries,
            config.max_retries
        );
        state.reset();
        return Outcome::single(Command::Halt, SessionPhase::Halted)
            .with_fault(ReadFault::RetryCeilingExceeded);
    }

    let mut outcome = queue::pop_and_navigate(state, config);
    outcome.fault = Some(ReadFault::NotFoundPage);
    if outcome.phase == SessionPhase::Navigating {
        outcome.phase = SessionPhase::ErrorRetrying;
    }
    outcome
}
