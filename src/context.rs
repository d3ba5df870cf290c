use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::ReaderConfig;
use crate::controller::{Command, Controller, Notice, Outcome};
use crate::like::LikeScheduler;
use crate::model::like_counter::LikeCounter;
use crate::model::reading_state::ReadingState;
use crate::page::{Page, PageObservation};
use crate::scroll::{FrameResult, ScrollDriver};
use crate::state::SessionPhase;
use crate::store::KeyValueStore;
use crate::timer::{Clock, TaskKind, TimerQueue};

/// 一次页面加载的结束方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEnd {
    /// 发起了跳转，下一次加载从持久状态继续
    Navigated(String),
    /// 超过重试上限，状态已重置
    Halted,
    /// 没有待执行的任务，页面保持不动
    Idle,
    /// 达到本次运行的任务数上限，页面仍在进行中
    Suspended,
}

/// 单次页面加载的执行上下文
///
/// 跳转时整个上下文被丢弃，只有写入存储的内容会留到下一次加载。
pub struct PageContext<'a, P: Page + ?Sized> {
    page: &'a mut P,
    store: &'a mut dyn KeyValueStore,
    controller: Controller,
    state: ReadingState,
    timers: TimerQueue,
    scroll: ScrollDriver,
    likes: LikeScheduler,
    rng: StdRng,
    notices: Vec<Notice>,
    phase: SessionPhase,
    end: Option<LoadEnd>,
}

impl<'a, P: Page + ?Sized> PageContext<'a, P> {
    /// 读取配置与状态，并检查每日点赞计数是否需要重置
    pub fn open(
        page: &'a mut P,
        store: &'a mut dyn KeyValueStore,
        now_ms: i64,
        seed: Option<u64>,
    ) -> Result<Self> {
        let config = ReaderConfig::load(store);
        let state = ReadingState::load(store);
        LikeCounter::refresh(store, now_ms)?;

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            page,
            store,
            scroll: ScrollDriver::new(&config),
            likes: LikeScheduler::new(&config),
            controller: Controller::new(config),
            state,
            timers: TimerQueue::new(),
            rng,
            notices: Vec::new(),
            phase: SessionPhase::Idle,
            end: None,
        })
    }

    pub fn state(&self) -> &ReadingState {
        &self.state
    }

    pub fn config(&self) -> &ReaderConfig {
        self.controller.config()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// 最近一次状态转移所处的阶段
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// 本次加载是否已经结束（跳转或停止）
    pub fn is_ended(&self) -> bool {
        self.end.is_some()
    }

    #[cfg(test)]
    pub fn is_scrolling(&self) -> bool {
        self.scroll.is_active(&self.timers)
    }

    #[cfg(test)]
    pub fn is_like_pending(&self) -> bool {
        self.likes.is_pending(&self.timers)
    }

    /// 页面加载入口，每次加载调用一次
    pub fn on_load(&mut self, now_ms: i64) -> Result<()> {
        if self.is_ended() {
            return Ok(());
        }
        let observation = PageObservation::capture(&*self.page, self.state.is_reading);
        let outcome = self
            .controller
            .on_load(&mut self.state, &observation, self.store)?;
        self.execute(outcome, now_ms);
        Ok(())
    }

    /// 切换阅读开关
    ///
    /// 打开时立即处理当前页面；关闭时只停止滚动，已安排的点赞仍会执行一次。
    /// 本次加载已结束时只保存开关，不再处理页面。
    pub fn set_reading(&mut self, reading: bool, now_ms: i64) -> Result<()> {
        self.state.is_reading = reading;
        if !reading {
            self.stop_scrolling();
        }
        self.state.save(self.store)?;

        if reading && !self.is_ended() {
            let observation = PageObservation::capture(&*self.page, true);
            let outcome =
                self.controller
                    .on_reading_enabled(&mut self.state, &observation, self.store)?;
            self.execute(outcome, now_ms);
        }
        Ok(())
    }

    /// 切换点赞开关，下一次进入阅读处理时生效
    pub fn set_liking(&mut self, liking: bool) -> Result<()> {
        self.state.is_liking = liking;
        self.state.save(self.store)
    }

    /// 运行本次加载的任务循环，直到跳转、停止、无事可做或达到任务上限
    pub fn run(&mut self, clock: &mut dyn Clock, max_tasks: usize) -> Result<LoadEnd> {
        for _ in 0..max_tasks {
            if let Some(end) = &self.end {
                return Ok(end.clone());
            }
            let Some(due) = self.timers.next_due() else {
                return Ok(LoadEnd::Idle);
            };
            clock.wait_until(due);
            let Some((_, _, kind)) = self.timers.pop_next() else {
                return Ok(LoadEnd::Idle);
            };
            self.dispatch(kind, clock.now_ms())?;
        }

        Ok(self.end.clone().unwrap_or(LoadEnd::Suspended))
    }

    fn dispatch(&mut self, kind: TaskKind, now_ms: i64) -> Result<()> {
        match kind {
            TaskKind::ScrollFrame => {
                if self.scroll.on_frame(&mut *self.page, &mut self.timers, now_ms)
                    == FrameResult::Completed
                {
                    self.stop_scrolling();
                    let outcome = self
                        .controller
                        .on_topic_finished(&mut self.state, self.store)?;
                    self.execute(outcome, now_ms);
                }
            }
            TaskKind::LikeAttempt => {
                self.likes.on_attempt(
                    &mut *self.page,
                    self.store,
                    &mut self.timers,
                    now_ms,
                    &mut self.rng,
                )?;
            }
        }
        Ok(())
    }

    fn stop_scrolling(&mut self) {
        self.scroll.stop(&mut self.timers);
        self.state.current_task = None;
    }

    /// 执行状态机给出的动作；此时状态已写入存储
    fn execute(&mut self, outcome: Outcome, now_ms: i64) {
        if let Some(end) = &self.end {
            log::debug!("Load already ended ({:?}), dropping {:?}", end, outcome.commands);
            return;
        }
        self.phase = outcome.phase;
        for command in outcome.commands {
            match command {
                Command::Navigate(url) => {
                    self.timers.teardown();
                    self.end = Some(LoadEnd::Navigated(url));
                    return;
                }
                Command::Halt => {
                    self.timers.teardown();
                    self.end = Some(LoadEnd::Halted);
                    return;
                }
                Command::ResumeLastUnread => self.page.press_resume_control(),
                Command::StartScrollLoop => {
                    if !self.scroll.start(&mut self.timers, now_ms) {
                        log::debug!("Scroll loop already running");
                    }
                }
                Command::StartLikeLoop => {
                    self.likes.start(&mut self.timers, now_ms);
                }
                Command::Notify(notice) => {
                    self.page.notify(notice.text());
                    self.notices.push(notice);
                }
                Command::Noop => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG;
    use crate::page::fake::FakePage;
    use crate::state::CurrentTask;
    use crate::store::MemoryStore;
    use crate::timer::ManualClock;
    use std::collections::VecDeque;

    const NOW: i64 = 1_700_000_000_000;

    fn save_state(store: &mut MemoryStore, state: ReadingState) {
        state.save(store).unwrap();
    }

    fn reading(queue: &[&str]) -> ReadingState {
        ReadingState {
            is_reading: true,
            unseen_hrefs: queue.iter().map(|s| s.to_string()).collect::<VecDeque<_>>(),
            ..ReadingState::default()
        }
    }

    fn load(page: &mut FakePage, store: &mut MemoryStore) -> LoadEnd {
        let mut clock = ManualClock::new(NOW);
        let mut context = PageContext::open(page, store, NOW, Some(1)).unwrap();
        context.on_load(NOW).unwrap();
        context.run(&mut clock, 10_000).unwrap()
    }

    #[test]
    fn test_end_to_end_read_error_and_refetch() {
        let mut store = MemoryStore::new();
        ReaderConfig {
            like_limit: 20,
            max_retries: 3,
            ..ReaderConfig::default()
        }
        .save(&mut store)
        .unwrap();
        save_state(&mut store, reading(&[]));

        let end = load(&mut FakePage::unseen(&["/t/1", "/t/2"]), &mut store);
        assert_eq!(end, LoadEnd::Navigated("https://linux.do/t/1".into()));

        let mut topic = FakePage::topic("/t/1", 4);
        topic.progress = Some("5/5".into());
        let end = load(&mut topic, &mut store);
        assert_eq!(end, LoadEnd::Navigated("https://linux.do/t/2".into()));
        assert!(ReadingState::load(&store).unseen_hrefs.is_empty());

        let end = load(&mut FakePage::not_found("/t/2"), &mut store);
        assert_eq!(end, LoadEnd::Navigated("https://linux.do/unseen".into()));
        assert_eq!(ReadingState::load(&store).error_retries, 1);

        let end = load(&mut FakePage::unseen(&["/t/3"]), &mut store);
        assert_eq!(end, LoadEnd::Navigated("https://linux.do/t/3".into()));
        assert_eq!(ReadingState::load(&store).error_retries, 1);
    }

    #[test]
    fn test_scrolls_until_progress_reports_complete() {
        let mut store = MemoryStore::new();
        save_state(&mut store, reading(&["/t/next"]));
        let mut topic = FakePage::topic("/t/1", 6);

        let end = load(&mut topic, &mut store);
        assert_eq!(end, LoadEnd::Navigated("https://linux.do/t/next".into()));
        // 6 帖 * 300px，视口 900px，需要滚动 900px
        assert_eq!(topic.scrolled.len(), 18);
        // 第一帖在第一次滚动后就越出视口顶部，最后一帖在完成的那一步才完整出现
        assert_eq!(topic.marked, vec![2, 3, 4, 5]);
        assert_eq!(
            ReadingState::load(&store).current_task,
            Some(CurrentTask::Navigating)
        );
    }

    #[test]
    fn test_retry_ceiling_halts_and_keeps_like_counter() {
        let mut store = MemoryStore::new();
        save_state(
            &mut store,
            ReadingState {
                error_retries: 3,
                ..reading(&["/t/4", "/t/5"])
            },
        );
        LikeCounter {
            count: 9,
            timestamp: Some(NOW),
        }
        .save(&mut store)
        .unwrap();

        let mut page = FakePage::not_found("/t/3");
        let mut clock = ManualClock::new(NOW);
        let mut context = PageContext::open(&mut page, &mut store, NOW, Some(1)).unwrap();
        context.on_load(NOW).unwrap();
        assert_eq!(context.phase(), SessionPhase::Halted);
        assert_eq!(context.run(&mut clock, 10).unwrap(), LoadEnd::Halted);
        drop(context);
        assert_eq!(ReadingState::load(&store), ReadingState::default());
        assert_eq!(LikeCounter::load(&store).count, 9);

        // 重置后不再阅读，下一次加载什么都不做
        let end = load(&mut FakePage::not_found("/t/4"), &mut store);
        assert_eq!(end, LoadEnd::Idle);
    }

    #[test]
    fn test_empty_unseen_list_notifies_and_stays() {
        let mut store = MemoryStore::new();
        save_state(&mut store, reading(&[]));
        let mut page = FakePage::unseen(&[]);

        let end = load(&mut page, &mut store);
        assert_eq!(end, LoadEnd::Idle);
        assert_eq!(page.notices, vec!["未发现未读内容".to_string()]);
    }

    #[test]
    fn test_liking_runs_alongside_scroll() {
        let mut store = MemoryStore::new();
        ReaderConfig {
            like_interval_min_ms: 100,
            like_interval_max_ms: 100,
            ..ReaderConfig::default()
        }
        .save(&mut store)
        .unwrap();
        save_state(
            &mut store,
            ReadingState {
                is_liking: true,
                ..reading(&["/t/2"])
            },
        );
        let mut topic = FakePage::topic("/t/1", 40);
        topic.like_targets = 3;
        topic.resume_control = true;

        let end = load(&mut topic, &mut store);
        assert!(matches!(end, LoadEnd::Navigated(_)));
        assert_eq!(topic.resume_pressed, 1);
        assert_eq!(topic.likes_pressed, 3);
        assert_eq!(LikeCounter::load(&store).count, 3);
    }

    #[test]
    fn test_like_limit_carries_across_loads() {
        let mut store = MemoryStore::new();
        LikeCounter {
            count: 20,
            timestamp: Some(NOW - 1000),
        }
        .save(&mut store)
        .unwrap();
        save_state(
            &mut store,
            ReadingState {
                is_liking: true,
                ..reading(&[])
            },
        );
        let mut topic = FakePage::topic("/t/1", 3);
        topic.like_targets = 3;

        load(&mut topic, &mut store);
        assert_eq!(topic.likes_pressed, 0);
    }

    #[test]
    fn test_day_rollover_on_open() {
        let mut store = MemoryStore::new();
        LikeCounter {
            count: 20,
            timestamp: Some(NOW - CONFIG.like_window_ms - 1),
        }
        .save(&mut store)
        .unwrap();

        let mut page = FakePage::blank("/latest");
        PageContext::open(&mut page, &mut store, NOW, Some(1)).unwrap();
        assert_eq!(LikeCounter::load(&store).count, 0);
    }

    #[test]
    fn test_stop_reading_cancels_scroll_but_not_pending_like() {
        let mut store = MemoryStore::new();
        save_state(
            &mut store,
            ReadingState {
                is_liking: true,
                ..reading(&["/t/2"])
            },
        );
        let mut topic = FakePage::topic("/t/1", 40);
        topic.like_targets = 1;
        let mut context = PageContext::open(&mut topic, &mut store, NOW, Some(1)).unwrap();
        context.on_load(NOW).unwrap();
        assert!(context.is_scrolling());
        assert!(context.is_like_pending());

        context.set_reading(false, NOW).unwrap();
        assert!(!context.is_scrolling());
        assert!(context.is_like_pending());
        assert_eq!(context.state().current_task, None);
        assert_eq!(ReadingState::load(&*context.store).current_task, None);

        let mut clock = ManualClock::new(NOW);
        assert_eq!(context.run(&mut clock, 100).unwrap(), LoadEnd::Idle);
        drop(context);
        assert_eq!(topic.likes_pressed, 1);
        assert!(!ReadingState::load(&store).is_reading);
    }

    #[test]
    fn test_start_reading_on_current_page() {
        let mut store = MemoryStore::new();
        save_state(&mut store, ReadingState::default());
        let mut topic = FakePage::topic("/t/1", 40);
        let mut context = PageContext::open(&mut topic, &mut store, NOW, Some(1)).unwrap();

        context.on_load(NOW).unwrap();
        assert!(!context.is_scrolling());

        context.set_reading(true, NOW).unwrap();
        assert!(context.is_scrolling());
        context.set_reading(true, NOW).unwrap();
        assert!(context.is_scrolling());
        assert_eq!(context.state().current_task, Some(CurrentTask::Scrolling));
    }

    #[test]
    fn test_start_reading_off_topic_skips_to_queue() {
        let mut store = MemoryStore::new();
        save_state(
            &mut store,
            ReadingState {
                is_reading: false,
                ..reading(&["/t/8"])
            },
        );
        let mut page = FakePage::blank("/latest");
        let mut context = PageContext::open(&mut page, &mut store, NOW, Some(1)).unwrap();
        context.on_load(NOW).unwrap();
        context.set_reading(true, NOW).unwrap();

        let mut clock = ManualClock::new(NOW);
        assert_eq!(
            context.run(&mut clock, 10).unwrap(),
            LoadEnd::Navigated("https://linux.do/t/8".into())
        );
    }

    #[test]
    fn test_start_reading_after_navigation_keeps_queue() {
        let mut store = MemoryStore::new();
        save_state(&mut store, ReadingState::default());
        let mut page = FakePage::unseen(&["/t/1", "/t/2", "/t/3"]);
        let mut context = PageContext::open(&mut page, &mut store, NOW, Some(1)).unwrap();

        // 未读列表页不论是否在阅读都会填充队列并跳转
        context.on_load(NOW).unwrap();
        assert!(context.is_ended());

        context.set_reading(true, NOW).unwrap();
        context.on_load(NOW).unwrap();
        let mut clock = ManualClock::new(NOW);
        assert_eq!(
            context.run(&mut clock, 10).unwrap(),
            LoadEnd::Navigated("https://linux.do/t/1".into())
        );
        drop(context);

        let state = ReadingState::load(&store);
        assert!(state.is_reading);
        assert_eq!(state.unseen_hrefs, ["/t/2", "/t/3"]);
    }

    #[test]
    fn test_never_completing_page_suspends() {
        let mut store = MemoryStore::new();
        save_state(&mut store, reading(&["/t/2"]));
        let mut topic = FakePage::topic("/t/1", 3);
        topic.progress = Some("abc".into());

        let end = load(&mut topic, &mut store);
        assert_eq!(end, LoadEnd::Suspended);
        assert_eq!(ReadingState::load(&store).unseen_hrefs, ["/t/2"]);
    }
}
