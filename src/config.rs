use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::store::KeyValueStore;

/// 应用程序配置常量
pub struct AppConfig {
    /// 应用目录名称
    pub dir_name: &'static str,
    /// 持久化存储文件名
    pub store_filename: &'static str,
    /// 阅读状态存储键
    pub state_key: &'static str,
    /// 每日点赞计数存储键
    pub like_count_key: &'static str,
    /// 点赞时间戳存储键
    pub like_timestamp_key: &'static str,
    /// 运行配置存储键
    pub reader_config_key: &'static str,
    /// 未读列表页路径
    pub unseen_path: &'static str,
    /// 404 页面标题标记
    pub not_found_marker: &'static str,
    /// 点赞计数重置窗口（毫秒）
    pub like_window_ms: i64,
    /// 动画帧间隔（毫秒），宿主按此频率请求滚动帧
    pub frame_interval_ms: u64,
}

impl AppConfig {
    /// 创建默认配置
    pub const fn default() -> Self {
        Self {
            dir_name: ".auto_read",
            store_filename: "store.json",
            state_key: "autoReadState",
            like_count_key: "likeCount",
            like_timestamp_key: "likeTimestamp",
            reader_config_key: "autoReadConfig",
            unseen_path: "/unseen",
            not_found_marker: "找不到页面",
            like_window_ms: 86_400_000, // 24小时
            frame_interval_ms: 16,
        }
    }
}

/// 全局配置实例
pub const CONFIG: AppConfig = AppConfig::default();

/// 运行配置，每次页面加载时读取一次，加载期间只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReaderConfig {
    /// 站点基础URL
    #[serde(rename = "baseURL")]
    pub base_url: String,
    /// 每日点赞上限
    pub like_limit: u32,
    /// 错误页面最大重试次数
    pub max_retries: u32,
    /// 滚动速度（像素/次）
    pub scroll_speed_px: u32,
    /// 滚动间隔（毫秒）
    pub scroll_interval_ms: u64,
    /// 点赞最小间隔（毫秒）
    pub like_interval_min_ms: u64,
    /// 点赞最大间隔（毫秒）
    pub like_interval_max_ms: u64,
    /// 状态面板刷新间隔（毫秒）
    pub status_update_interval_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://linux.do".to_string(),
            like_limit: 20,
            max_retries: 3,
            scroll_speed_px: 50,
            scroll_interval_ms: 100,
            like_interval_min_ms: 2000,
            like_interval_max_ms: 5000,
            status_update_interval_ms: 500,
        }
    }
}

/// 可通过 `config set` 修改的字段名
pub const EDITABLE_KEYS: &[&str] = &[
    "baseURL",
    "likeLimit",
    "maxRetries",
    "scrollSpeedPx",
    "scrollIntervalMs",
    "likeIntervalMinMs",
    "likeIntervalMaxMs",
    "statusUpdateIntervalMs",
];

impl ReaderConfig {
    /// 从存储加载配置，缺失字段回退默认值，解析失败时整体回退默认值
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.get(CONFIG.reader_config_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                log::warn!("Failed to read {}: {}", CONFIG.reader_config_key, e);
                return Self::default();
            }
        };

        match serde_json::from_value::<ReaderConfig>(raw) {
            Ok(config) => config.validated(),
            Err(e) => {
                log::warn!("Failed to parse {}: {}", CONFIG.reader_config_key, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        store.set(CONFIG.reader_config_key, serde_json::to_value(self)?)
    }

    /// 修正不合理的取值：间隔至少 1ms，点赞间隔上下界有序
    pub fn validated(mut self) -> Self {
        self.scroll_interval_ms = self.scroll_interval_ms.max(1);
        self.status_update_interval_ms = self.status_update_interval_ms.max(1);
        if self.like_interval_min_ms > self.like_interval_max_ms {
            std::mem::swap(&mut self.like_interval_min_ms, &mut self.like_interval_max_ms);
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self
    }

    /// 按字段名修改单个配置项
    ///
    /// # Errors
    ///
    /// 字段名未知或取值无法解析时返回错误。
    pub fn with_field(&self, key: &str, value: &str) -> Result<Self> {
        if !EDITABLE_KEYS.contains(&key) {
            bail!("未知配置项: {} (可选: {})", key, EDITABLE_KEYS.join(", "));
        }

        let mut json = serde_json::to_value(self)?;
        let parsed = if key == "baseURL" {
            serde_json::Value::String(value.to_string())
        } else {
            let number: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("{} 需要非负整数, 得到 {:?}", key, value))?;
            serde_json::Value::from(number)
        };
        json[key] = parsed;

        let updated: ReaderConfig =
            serde_json::from_value(json).with_context(|| format!("{} 取值超出范围", key))?;
        Ok(updated.validated())
    }

    /// 下一次刷新状态面板的时间，超大间隔按不溢出处理
    pub fn next_status_refresh(&self, now_ms: i64) -> i64 {
        let interval = i64::try_from(self.status_update_interval_ms).unwrap_or(i64::MAX);
        now_ms.saturating_add(interval)
    }

    pub fn unseen_url(&self) -> String {
        format!("{}{}", self.base_url, CONFIG.unseen_path)
    }
}
