use anyhow::Result;
use serde_json::Value;

use crate::config::CONFIG;
use crate::store::KeyValueStore;

/// 每日点赞计数，独立于阅读状态，重置阅读状态时不受影响
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LikeCounter {
    pub count: u32,
    /// 最近一次点赞（或重置）的时间，毫秒时间戳
    pub timestamp: Option<i64>,
}

impl LikeCounter {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let count = read_number(store, CONFIG.like_count_key)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);
        let timestamp = read_number(store, CONFIG.like_timestamp_key);
        Self { count, timestamp }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        store.set(CONFIG.like_count_key, Value::from(self.count))?;
        if let Some(timestamp) = self.timestamp {
            store.set(CONFIG.like_timestamp_key, Value::from(timestamp))?;
        }
        Ok(())
    }

    /// 距上次更新超过 24 小时则清零，返回是否发生了重置
    ///
    /// 没有时间戳时从不重置。
    pub fn roll_over(&mut self, now_ms: i64) -> bool {
        match self.timestamp {
            Some(last) if now_ms - last > CONFIG.like_window_ms => {
                self.count = 0;
                self.timestamp = Some(now_ms);
                true
            }
            _ => false,
        }
    }

    /// 加载、按需重置并保存，每次页面加载调用一次
    pub fn refresh(store: &mut dyn KeyValueStore, now_ms: i64) -> Result<Self> {
        let mut counter = Self::load(store);
        if counter.roll_over(now_ms) {
            log::info!("Daily like counter reset");
            counter.save(store)?;
        }
        Ok(counter)
    }

    pub fn record_like(&mut self, now_ms: i64) {
        self.count = self.count.saturating_add(1);
        self.timestamp = Some(now_ms);
    }

    pub fn reached(&self, limit: u32) -> bool {
        self.count >= limit
    }
}

/// 兼容数字和数字字符串两种写法
fn read_number(store: &dyn KeyValueStore, key: &str) -> Option<i64> {
    match store.get(key) {
        Ok(Some(Value::Number(n))) => n.as_i64(),
        Ok(Some(Value::String(s))) => s.trim().parse().ok(),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Failed to read {}: {}", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    const T: i64 = 1_700_000_000_000;
    const DAY: i64 = 86_400_000;

    #[test]
    fn test_no_reset_within_window() {
        for now in [T, T + 1, T + DAY - 1, T + DAY] {
            let mut counter = LikeCounter {
                count: 7,
                timestamp: Some(T),
            };
            assert!(!counter.roll_over(now));
            assert_eq!(counter.count, 7);
            assert_eq!(counter.timestamp, Some(T));
        }
    }

    #[test]
    fn test_reset_after_window() {
        let mut counter = LikeCounter {
            count: 7,
            timestamp: Some(T),
        };
        assert!(counter.roll_over(T + DAY + 1));
        assert_eq!(counter.count, 0);
        assert_eq!(counter.timestamp, Some(T + DAY + 1));
    }

    #[test]
    fn test_missing_timestamp_never_resets() {
        let mut counter = LikeCounter {
            count: 3,
            timestamp: None,
        };
        assert!(!counter.roll_over(T));
        assert_eq!(counter.count, 3);
    }

    #[test]
    fn test_load_accepts_string_numbers() {
        let mut store = MemoryStore::new();
        store.set(CONFIG.like_count_key, json!("12")).unwrap();
        store.set(CONFIG.like_timestamp_key, json!(T)).unwrap();

        let counter = LikeCounter::load(&store);
        assert_eq!(counter.count, 12);
        assert_eq!(counter.timestamp, Some(T));
    }

    #[test]
    fn test_refresh_persists_reset() {
        let mut store = MemoryStore::new();
        LikeCounter {
            count: 20,
            timestamp: Some(T),
        }
        .save(&mut store)
        .unwrap();

        let counter = LikeCounter::refresh(&mut store, T + DAY + 5).unwrap();
        assert_eq!(counter.count, 0);
        assert_eq!(LikeCounter::load(&store), counter);
    }

    #[test]
    fn test_record_like_and_limit() {
        let mut counter = LikeCounter {
            count: 19,
            timestamp: None,
        };
        assert!(!counter.reached(20));
        counter.record_like(T);
        assert_eq!(counter.count, 20);
        assert_eq!(counter.timestamp, Some(T));
        assert!(counter.reached(20));
    }
}
