use super::{Command, Notice, Outcome, ReadFault};
use crate::config::ReaderConfig;
use crate::model::reading_state::ReadingState;
use crate::state::{CurrentTask, SessionPhase};

/// 用未读列表页上的链接替换队列，然后打开第一个
///
/// 列表为空时只提示用户，本轮不再重试。
pub fn refill(state: &mut ReadingState, links: &[String], config: &ReaderConfig) -> Outcome {
    if links.is_empty() {
        return Outcome::single(Command::Notify(Notice::NoUnreadContent), SessionPhase::Idle)
            .with_fault(ReadFault::NoUnreadContent);
    }

    log::info!("Queued {} unseen topics", links.len());
    state.unseen_hrefs = links.iter().cloned().collect();
    pop_and_navigate(state, config)
}

/// 取出队首链接并跳转；队列为空时回到未读列表重新获取
///
/// 取出的链接不会再次入队，出错的帖子直接丢弃。
pub fn pop_and_navigate(state: &mut ReadingState, config: &ReaderConfig) -> Outcome {
    match state.unseen_hrefs.pop_front() {
        Some(href) => {
            state.current_task = Some(CurrentTask::Navigating);
            let url = format!("{}{}", config.base_url, href);
            log::info!("Opening {} ({} left)", url, state.unseen_hrefs.len());
            Outcome::single(Command::Navigate(url), SessionPhase::Navigating)
        }
        None => Outcome::single(Command::Navigate(config.unseen_url()), SessionPhase::Fetching)
            .with_fault(ReadFault::EmptyQueue),
    }
}
