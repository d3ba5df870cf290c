use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::CONFIG;

/// 跨页面加载持久存在的键值存储
///
/// 每次写入在返回前必须落盘，调用方依赖这一点保证"先写后跳转"。
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// 基于单个 JSON 文件的存储，整体读入，逐次写穿
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl FileStore {
    /// 打开存储文件，不存在时视为空存储
    ///
    /// # Errors
    ///
    /// 文件存在但无法读取时返回错误；内容损坏时记录警告并从空存储开始。
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries = BTreeMap::new();

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            match serde_json::from_str::<Map<String, Value>>(&content) {
                Ok(map) => entries.extend(map),
                Err(e) => log::warn!("Failed to parse {}: {}", path.display(), e),
            }
        }

        Ok(Self { path, entries })
    }

    /// 默认存储位置：`~/.auto_read/store.json`
    pub fn default_path() -> PathBuf {
        let mut path = home::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(CONFIG.dir_name);
        path.push(CONFIG.store_filename);
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 先写临时文件再重命名，避免崩溃时留下截断的记录
    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// 内存存储，用于测试和 `--ephemeral` 模拟
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累计写入次数
    #[cfg(test)]
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        self.writes += 1;
        Ok(())
    }
}
