use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::CONFIG;
use crate::state::CurrentTask;
use crate::store::KeyValueStore;

/// 跨页面持久化的阅读状态，存储在单个键下
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadingState {
    /// 是否正在阅读
    pub is_reading: bool,
    /// 是否启用自动点赞
    pub is_liking: bool,
    /// 控制面板是否隐藏（仅展示用）
    pub is_panel_hidden: bool,
    /// 上次重置以来累计的错误页面次数
    pub error_retries: u32,
    /// 未读帖子链接队列，按发现顺序处理
    pub unseen_hrefs: VecDeque<String>,
    /// 当前任务
    pub current_task: Option<CurrentTask>,
}

impl ReadingState {
    /// 从存储加载状态，缺失字段使用默认值
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.get(CONFIG.state_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                log::warn!("Failed to read {}: {}", CONFIG.state_key, e);
                return Self::default();
            }
        };

        serde_json::from_value(raw).unwrap_or_else(|e| {
            log::warn!("Failed to parse {}: {}", CONFIG.state_key, e);
            Self::default()
        })
    }

    /// 持久化保存状态
    /// # 错误
    /// 返回存储写入或序列化错误
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        store.set(CONFIG.state_key, serde_json::to_value(self)?)
    }

    /// 用全新的默认状态替换
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
