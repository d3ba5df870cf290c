use anyhow::Result;
use std::fmt;

use crate::config::ReaderConfig;
use crate::model::reading_state::ReadingState;
use crate::page::{PageKind, PageObservation};
use crate::state::{CurrentTask, SessionPhase};
use crate::store::KeyValueStore;

pub mod queue;
pub mod retry;

/// 一次状态转移要求宿主执行的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 跳转到目标地址，当前页面上下文随之结束
    Navigate(String),
    /// 点击"返回上一个未读帖子"
    ResumeLastUnread,
    StartScrollLoop,
    StartLikeLoop,
    Notify(Notice),
    /// 自动化整体停止，等待手动重新开始
    Halt,
    Noop,
}

/// 需要告知用户的消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    NoUnreadContent,
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::NoUnreadContent => "未发现未读内容",
        }
    }
}

/// 阅读过程中可观察到的异常情况
///
/// 全部由页面内容和持久状态判定，不在进程内传播。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFault {
    /// 404 页面，跳过并计入重试次数
    NotFoundPage,
    /// 队列耗尽，回到未读列表重新获取
    EmptyQueue,
    /// 未读列表为空，本轮结束
    NoUnreadContent,
    /// 超过重试上限，状态整体重置
    RetryCeilingExceeded,
}

impl fmt::Display for ReadFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReadFault::NotFoundPage => "page not found, skipping",
            ReadFault::EmptyQueue => "queue exhausted, refetching unseen list",
            ReadFault::NoUnreadContent => "no unread content",
            ReadFault::RetryCeilingExceeded => "retry ceiling exceeded, state reset",
        };
        f.write_str(text)
    }
}

/// 状态转移的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub commands: Vec<Command>,
    pub fault: Option<ReadFault>,
    pub phase: SessionPhase,
}

impl Outcome {
    pub fn single(command: Command, phase: SessionPhase) -> Self {
        Self {
            commands: vec![command],
            fault: None,
            phase,
        }
    }

    pub fn with_fault(mut self, fault: ReadFault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// 本次结果中的跳转目标
    pub fn navigation(&self) -> Option<&str> {
        self.commands.iter().find_map(|c| match c {
            Command::Navigate(url) => Some(url.as_str()),
            _ => None,
        })
    }
}

/// 纯状态转移函数：(持久状态, 页面快照) -> (新状态, 动作)
pub fn transition(
    mut state: ReadingState,
    observation: &PageObservation,
    config: &ReaderConfig,
) -> (ReadingState, Outcome) {
    let outcome = route(&mut state, observation, config);
    (state, outcome)
}

fn route(state: &mut ReadingState, observation: &PageObservation, config: &ReaderConfig) -> Outcome {
    if observation.kind == PageKind::UnseenList {
        return queue::refill(state, &observation.unseen_links, config);
    }
    if state.is_reading {
        return process_page(state, observation, config);
    }
    Outcome::single(Command::Noop, SessionPhase::Idle)
}

/// 阅读中对当前页面的处理
fn process_page(
    state: &mut ReadingState,
    observation: &PageObservation,
    config: &ReaderConfig,
) -> Outcome {
    match observation.kind {
        PageKind::ErrorPage => retry::handle_error_page(state, config),
        PageKind::PostDetail => {
            let mut commands = Vec::new();
            if observation.has_resume_control {
                commands.push(Command::ResumeLastUnread);
            }
            state.current_task = Some(CurrentTask::Scrolling);
            commands.push(Command::StartScrollLoop);
            if state.is_liking {
                commands.push(Command::StartLikeLoop);
            }
            Outcome {
                commands,
                fault: None,
                phase: SessionPhase::Reading,
            }
        }
        // 落在没有帖子内容的页面，直接跳到下一个
        PageKind::UnseenList | PageKind::Other => queue::pop_and_navigate(state, config),
    }
}

/// 每次页面加载构造一次，持有本次加载期间只读的配置
///
/// 所有状态变更都在返回动作之前写入存储。
pub struct Controller {
    config: ReaderConfig,
}

impl Controller {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// 页面加载入口
    pub fn on_load(
        &self,
        state: &mut ReadingState,
        observation: &PageObservation,
        store: &mut dyn KeyValueStore,
    ) -> Result<Outcome> {
        log::debug!("Page classified as {:?}", observation.kind);
        self.advance(state, store, |state, config| {
            let (next, outcome) = transition(std::mem::take(state), observation, config);
            *state = next;
            outcome
        })
    }

    /// 当前页面进入阅读处理（开启阅读开关时调用）
    pub fn on_reading_enabled(
        &self,
        state: &mut ReadingState,
        observation: &PageObservation,
        store: &mut dyn KeyValueStore,
    ) -> Result<Outcome> {
        self.advance(state, store, |state, config| {
            process_page(state, observation, config)
        })
    }

    /// 当前帖子已读完
    pub fn on_topic_finished(
        &self,
        state: &mut ReadingState,
        store: &mut dyn KeyValueStore,
    ) -> Result<Outcome> {
        self.advance(state, store, queue::pop_and_navigate)
    }

    fn advance(
        &self,
        state: &mut ReadingState,
        store: &mut dyn KeyValueStore,
        step: impl FnOnce(&mut ReadingState, &ReaderConfig) -> Outcome,
    ) -> Result<Outcome> {
        let before = state.clone();
        let outcome = step(state, &self.config);

        if *state != before {
            state.save(store)?;
        }
        if let Some(fault) = outcome.fault {
            log::info!("{}", fault);
        }
        if let Some(url) = outcome.navigation() {
            log::debug!("Navigating to {} ({:?})", url, outcome.phase);
        } else {
            log::debug!("Phase {:?}, commands {:?}", outcome.phase, outcome.commands);
        }
        Ok(outcome)
    }
}
