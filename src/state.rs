use serde::{Deserialize, Serialize};

/// 最近一次进行中的操作，仅作提示，不用于跨页面的重入判断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrentTask {
    Navigating,
    Scrolling,
}

/// 单次阅读会话在多次页面加载之间所处的阶段
///
/// 不持久化，由页面分类与持久状态推导，用于日志和状态显示。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Fetching,
    Navigating,
    Reading,
    ErrorRetrying,
    Halted,
}

impl SessionPhase {
    pub fn text(&self) -> &str {
        match self {
            SessionPhase::Idle => "空闲",
            SessionPhase::Fetching => "获取未读列表",
            SessionPhase::Navigating => "跳转中",
            SessionPhase::Reading => "阅读中",
            SessionPhase::ErrorRetrying => "错误重试",
            SessionPhase::Halted => "已停止",
        }
    }
}
