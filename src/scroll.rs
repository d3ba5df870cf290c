use crate::config::{CONFIG, ReaderConfig};
use crate::page::Page;
use crate::timer::{TaskHandle, TaskKind, TimerQueue};

/// 从回复进度文本中取出 (已读, 总数)
///
/// 取前两段连续数字，不足两段或无法解析时返回 None。
pub fn parse_progress(text: &str) -> Option<(u64, u64)> {
    let mut groups = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|group| !group.is_empty());

    let seen = groups.next()?.parse().ok()?;
    let total = groups.next()?.parse().ok()?;
    Some((seen, total))
}

/// 进度显示已读到最后一条
pub fn is_complete(progress: Option<&str>) -> bool {
    matches!(progress.and_then(parse_progress), Some((seen, total)) if seen == total)
}

/// 单帧处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameResult {
    /// 距上次滚动不足间隔，本帧不做事
    Throttled,
    /// 滚动了一步，标记了若干可见帖子
    Advanced { marked: usize },
    /// 已读完，循环已停止
    Completed,
}

/// 平滑滚动驱动
///
/// 宿主按帧调用，实际滚动频率受 `scroll_interval_ms` 限制。
#[derive(Debug)]
pub struct ScrollDriver {
    speed_px: u32,
    interval_ms: i64,
    last_step: Option<i64>,
    handle: Option<TaskHandle>,
}

impl ScrollDriver {
    pub fn new(config: &ReaderConfig) -> Self {
        Self {
            speed_px: config.scroll_speed_px,
            interval_ms: i64::try_from(config.scroll_interval_ms).unwrap_or(i64::MAX),
            last_step: None,
            handle: None,
        }
    }

    pub fn is_active(&self, timers: &TimerQueue) -> bool {
        self.handle.is_some_and(|handle| timers.is_live(handle))
    }

    /// 开始滚动，已在滚动时不重复启动
    pub fn start(&mut self, timers: &mut TimerQueue, now_ms: i64) -> bool {
        if self.is_active(timers) {
            return false;
        }
        self.handle = timers.schedule(next_frame(now_ms), TaskKind::ScrollFrame);
        self.handle.is_some()
    }

    pub fn stop(&mut self, timers: &mut TimerQueue) {
        if let Some(handle) = self.handle.take() {
            timers.cancel(handle);
        }
    }

    /// 处理一帧，该帧的任务已从队列中取出
    pub fn on_frame<P: Page + ?Sized>(
        &mut self,
        page: &mut P,
        timers: &mut TimerQueue,
        now_ms: i64,
    ) -> FrameResult {
        self.handle = None;

        if let Some(last) = self.last_step
            && now_ms - last < self.interval_ms
        {
            self.handle = timers.schedule(next_frame(now_ms), TaskKind::ScrollFrame);
            return FrameResult::Throttled;
        }
        self.last_step = Some(now_ms);

        page.scroll_by(self.speed_px);

        if is_complete(page.reply_progress().as_deref()) {
            self.stop(timers);
            return FrameResult::Completed;
        }

        let marked = mark_visible_posts(page);
        self.handle = timers.schedule(next_frame(now_ms), TaskKind::ScrollFrame);
        FrameResult::Advanced { marked }
    }
}

fn next_frame(now_ms: i64) -> i64 {
    now_ms + CONFIG.frame_interval_ms as i64
}

/// 把完全位于视口内的帖子标记为已读
fn mark_visible_posts<P: Page + ?Sized>(page: &mut P) -> usize {
    let viewport = page.viewport_height();
    let visible: Vec<u64> = page
        .items()
        .iter()
        .filter(|item| item.fully_visible(viewport))
        .map(|item| item.id)
        .collect();

    if !visible.is_empty() {
        page.mark_read(&visible);
    }
    visible.len()
}
