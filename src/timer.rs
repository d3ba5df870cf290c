use std::collections::BTreeMap;
use std::time::Duration;

/// 时间来源，毫秒时间戳
pub trait Clock {
    fn now_ms(&self) -> i64;
    /// 等待到指定时间（虚拟时钟直接跳过去）
    fn wait_until(&mut self, ms: i64);
}

/// 真实时钟
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn wait_until(&mut self, ms: i64) {
        let remaining = ms - self.now_ms();
        if remaining > 0 {
            std::thread::sleep(Duration::from_millis(remaining as u64));
        }
    }
}

/// 虚拟时钟，用于模拟和测试
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: i64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self { now: start_ms }
    }

    #[cfg(test)]
    pub fn advance(&mut self, ms: i64) {
        self.now += ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now
    }

    fn wait_until(&mut self, ms: i64) {
        self.now = self.now.max(ms);
    }
}

/// 延迟任务的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// 下一帧滚动
    ScrollFrame,
    /// 下一次点赞尝试
    LikeAttempt,
}

/// 可取消的延迟任务句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(u64);

/// 单个页面上下文内的延迟任务队列
///
/// 页面跳转时调用 `teardown`，之后所有句柄失效，新任务也不再接受。
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    /// (到期时间, 句柄) -> 任务种类，同一时刻按创建顺序执行
    pending: BTreeMap<(i64, TaskHandle), TaskKind>,
    torn_down: bool,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 安排任务；上下文已销毁时返回 None
    pub fn schedule(&mut self, due_ms: i64, kind: TaskKind) -> Option<TaskHandle> {
        if self.torn_down {
            return None;
        }
        self.next_id += 1;
        let handle = TaskHandle(self.next_id);
        self.pending.insert((due_ms, handle), kind);
        Some(handle)
    }

    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let key = self.pending.keys().find(|(_, h)| *h == handle).copied();
        match key {
            Some(key) => self.pending.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn is_live(&self, handle: TaskHandle) -> bool {
        self.pending.keys().any(|(_, h)| *h == handle)
    }

    pub fn next_due(&self) -> Option<i64> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    /// 取出最早到期的任务
    pub fn pop_next(&mut self) -> Option<(i64, TaskHandle, TaskKind)> {
        let ((due, handle), kind) = self.pending.pop_first()?;
        Some((due, handle, kind))
    }

    pub fn teardown(&mut self) {
        self.pending.clear();
        self.torn_down = true;
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
