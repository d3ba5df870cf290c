use anyhow::Result;
use std::fmt;

use crate::config::{CONFIG, ReaderConfig};
use crate::model::like_counter::LikeCounter;
use crate::model::reading_state::ReadingState;
use crate::store::KeyValueStore;

/// 开关操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Switch {
    On,
    Off,
    Toggle,
}

impl Switch {
    fn apply(self, current: bool) -> bool {
        match self {
            Switch::On => true,
            Switch::Off => false,
            Switch::Toggle => !current,
        }
    }
}

/// 修改阅读开关，返回新值
///
/// 只写入存储，下一次页面加载时按新状态处理。
pub fn set_reading(store: &mut dyn KeyValueStore, switch: Switch) -> Result<bool> {
    let mut state = ReadingState::load(store);
    state.is_reading = switch.apply(state.is_reading);
    if !state.is_reading {
        state.current_task = None;
    }
    state.save(store)?;
    log::info!("Reading {}", if state.is_reading { "enabled" } else { "disabled" });
    Ok(state.is_reading)
}

/// 修改点赞开关，返回新值
pub fn set_liking(store: &mut dyn KeyValueStore, switch: Switch) -> Result<bool> {
    let mut state = ReadingState::load(store);
    state.is_liking = switch.apply(state.is_liking);
    state.save(store)?;
    log::info!("Liking {}", if state.is_liking { "enabled" } else { "disabled" });
    Ok(state.is_liking)
}

/// 显示或隐藏状态面板，返回是否隐藏
pub fn toggle_panel(store: &mut dyn KeyValueStore) -> Result<bool> {
    let mut state = ReadingState::load(store);
    state.is_panel_hidden = !state.is_panel_hidden;
    state.save(store)?;
    Ok(state.is_panel_hidden)
}

/// 重置阅读状态：清空队列、重试次数和开关，点赞计数保留
pub fn reset_state(store: &mut dyn KeyValueStore) -> Result<()> {
    let mut state = ReadingState::load(store);
    state.reset();
    state.save(store)?;
    log::info!("Reading state reset");
    Ok(())
}

/// 修改单个配置项并保存
pub fn set_config(store: &mut dyn KeyValueStore, key: &str, value: &str) -> Result<ReaderConfig> {
    let config = ReaderConfig::load(store).with_field(key, value)?;
    config.save(store)?;
    log::info!("Config {} set to {}", key, value);
    Ok(config)
}

/// 删除已保存的配置，之后的加载都使用默认值
pub fn reset_config(store: &mut dyn KeyValueStore) -> Result<ReaderConfig> {
    store.remove(CONFIG.reader_config_key)?;
    Ok(ReaderConfig::default())
}

/// 状态面板内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub is_reading: bool,
    pub is_liking: bool,
    pub is_panel_hidden: bool,
    pub likes_today: u32,
    pub like_limit: u32,
    pub queued: usize,
    pub error_retries: u32,
    pub max_retries: u32,
}

impl StatusReport {
    /// 读取当前状态，不写入存储
    ///
    /// 点赞计数已过期时按 0 显示，实际重置发生在下一次页面加载。
    pub fn collect(store: &dyn KeyValueStore, now_ms: i64) -> Self {
        let state = ReadingState::load(store);
        let config = ReaderConfig::load(store);
        let mut counter = LikeCounter::load(store);
        counter.roll_over(now_ms);

        Self {
            is_reading: state.is_reading,
            is_liking: state.is_liking,
            is_panel_hidden: state.is_panel_hidden,
            likes_today: counter.count,
            like_limit: config.like_limit,
            queued: state.unseen_hrefs.len(),
            error_retries: state.error_retries,
            max_retries: config.max_retries,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "阅读状态：{}",
            if self.is_reading { "运行中" } else { "已停止" }
        )?;
        writeln!(
            f,
            "点赞状态：{}",
            if self.is_liking { "启用" } else { "禁用" }
        )?;
        writeln!(f, "今日点赞：{}/{}", self.likes_today, self.like_limit)?;
        writeln!(f, "剩余帖子：{}", self.queued)?;
        write!(f, "错误重试：{}/{}", self.error_retries, self.max_retries)
    }
}

/// 打印面板；面板隐藏时只输出一行提示
pub fn render_status(report: &StatusReport) -> String {
    if report.is_panel_hidden {
        return "状态面板已隐藏，使用 ar panel 重新显示".to_string();
    }
    report.to_string()
}
