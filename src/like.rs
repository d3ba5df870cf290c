use anyhow::Result;
use rand::Rng;

use crate::config::ReaderConfig;
use crate::model::like_counter::LikeCounter;
use crate::page::Page;
use crate::store::KeyValueStore;
use crate::timer::{TaskHandle, TaskKind, TimerQueue};

/// 一次点赞尝试的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAttempt {
    /// 今日已达上限，不再安排
    LimitReached,
    /// 页面上没有可点的按钮，不再安排
    NoTarget,
    /// 点了一个赞，并安排了下一次
    Liked { count: u32, next_in_ms: u64 },
}

/// 自动点赞调度：每次尝试最多安排一个后继，间隔随机
#[derive(Debug)]
pub struct LikeScheduler {
    limit: u32,
    min_ms: u64,
    max_ms: u64,
    handle: Option<TaskHandle>,
}

impl LikeScheduler {
    pub fn new(config: &ReaderConfig) -> Self {
        Self {
            limit: config.like_limit,
            min_ms: config.like_interval_min_ms,
            max_ms: config.like_interval_max_ms.max(config.like_interval_min_ms),
            handle: None,
        }
    }

    pub fn is_pending(&self, timers: &TimerQueue) -> bool {
        self.handle.is_some_and(|handle| timers.is_live(handle))
    }

    /// 立即安排一次尝试；已有待执行的尝试时不重复安排
    pub fn start(&mut self, timers: &mut TimerQueue, now_ms: i64) -> bool {
        if self.is_pending(timers) {
            return false;
        }
        self.handle = timers.schedule(now_ms, TaskKind::LikeAttempt);
        self.handle.is_some()
    }

    /// 执行一次尝试，该尝试的任务已从队列中取出
    ///
    /// 计数在安排下一次之前写入存储。
    pub fn on_attempt<P: Page + ?Sized, R: Rng>(
        &mut self,
        page: &mut P,
        store: &mut dyn KeyValueStore,
        timers: &mut TimerQueue,
        now_ms: i64,
        rng: &mut R,
    ) -> Result<LikeAttempt> {
        self.handle = None;

        let mut counter = LikeCounter::load(store);
        if counter.reached(self.limit) {
            log::debug!("Daily like limit reached ({}/{})", counter.count, self.limit);
            return Ok(LikeAttempt::LimitReached);
        }

        if !page.has_like_target() || !page.press_like() {
            return Ok(LikeAttempt::NoTarget);
        }

        counter.record_like(now_ms);
        counter.save(store)?;

        let delay = rng.gen_range(self.min_ms..=self.max_ms);
        self.handle = timers.schedule(
            now_ms.saturating_add(i64::try_from(delay).unwrap_or(i64::MAX)),
            TaskKind::LikeAttempt,
        );
        log::info!(
            "Liked a post ({}/{}), next attempt in {}ms",
            counter.count,
            self.limit,
            delay
        );

        Ok(LikeAttempt::Liked {
            count: counter.count,
            next_in_ms: delay,
        })
    }
}
