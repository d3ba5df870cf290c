use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::CONFIG;
use crate::page::{ItemBox, PageActions, PageObserver};

const SITE_TITLE: &str = "LINUX DO";

/// 模拟站点中的一个帖子
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimTopic {
    pub href: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_posts")]
    pub posts: u64,
    /// 可点赞的楼层数
    #[serde(default)]
    pub likes: u32,
    /// 帖子已被删除，访问时返回 404
    #[serde(default)]
    pub missing: bool,
    /// 已读到的楼层
    #[serde(default)]
    pub last_read: u64,
    #[serde(skip)]
    pub visits: u32,
}

fn default_posts() -> u64 {
    10
}

impl SimTopic {
    pub fn is_read(&self) -> bool {
        !self.missing && self.last_read >= self.posts
    }
}

/// 模拟站点：未读列表加若干帖子，带滚动几何
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimSite {
    pub topics: Vec<SimTopic>,
    #[serde(default = "default_viewport")]
    pub viewport: f64,
    #[serde(default = "default_post_height")]
    pub post_height: f64,
    /// 未读列表一页显示的帖子数
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(skip)]
    pub notices: Vec<String>,
    #[serde(skip)]
    pub likes_given: u32,
}

fn default_viewport() -> f64 {
    900.0
}

fn default_post_height() -> f64 {
    300.0
}

fn default_page_size() -> usize {
    30
}

impl SimSite {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let site: SimSite = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(site)
    }

    /// 未读列表：未读完的帖子，以及还没被访问过的已删除帖子
    pub fn unseen(&self) -> Vec<String> {
        self.topics
            .iter()
            .filter(|t| if t.missing { t.visits == 0 } else { !t.is_read() })
            .take(self.page_size)
            .map(|t| t.href.clone())
            .collect()
    }

    pub fn unread_count(&self) -> usize {
        self.topics.iter().filter(|t| !t.missing && !t.is_read()).count()
    }

    fn topic_index(&self, path: &str) -> Option<usize> {
        self.topics.iter().position(|t| t.href == path)
    }
}

/// 模拟站点上打开的一个页面
pub struct SimPage<'s> {
    site: &'s mut SimSite,
    path: String,
    topic: Option<usize>,
    scroll_y: f64,
    marked: usize,
}

impl<'s> SimPage<'s> {
    pub fn open(site: &'s mut SimSite, path: &str) -> Self {
        let topic = site.topic_index(path);
        if let Some(index) = topic {
            site.topics[index].visits += 1;
        }
        Self {
            site,
            path: path.to_string(),
            topic,
            scroll_y: 0.0,
            marked: 0,
        }
    }

    pub fn marked(&self) -> usize {
        self.marked
    }

    fn live_topic(&self) -> Option<&SimTopic> {
        self.topic
            .map(|index| &self.site.topics[index])
            .filter(|topic| !topic.missing)
    }

    fn seen_posts(&self) -> u64 {
        let Some(topic) = self.live_topic() else {
            return 0;
        };
        let bottom = self.scroll_y + self.site.viewport;
        ((bottom / self.site.post_height).floor() as u64).min(topic.posts)
    }

    fn record_progress(&mut self) {
        let seen = self.seen_posts();
        if let Some(index) = self.topic {
            let topic = &mut self.site.topics[index];
            topic.last_read = topic.last_read.max(seen);
        }
    }
}

impl PageObserver for SimPage<'_> {
    fn path(&self) -> String {
        self.path.clone()
    }

    fn title(&self) -> String {
        match self.topic.map(|index| &self.site.topics[index]) {
            Some(topic) if topic.missing => format!("{} - {}", CONFIG.not_found_marker, SITE_TITLE),
            Some(topic) if !topic.title.is_empty() => format!("{} - {}", topic.title, SITE_TITLE),
            _ => SITE_TITLE.to_string(),
        }
    }

    fn unseen_links(&self) -> Vec<String> {
        if self.path == CONFIG.unseen_path {
            self.site.unseen()
        } else {
            Vec::new()
        }
    }

    fn has_post_marker(&self) -> bool {
        self.live_topic().is_some()
    }

    fn reply_progress(&self) -> Option<String> {
        self.live_topic()
            .map(|topic| format!("{} / {}", self.seen_posts(), topic.posts))
    }

    fn items(&self) -> Vec<ItemBox> {
        let Some(topic) = self.live_topic() else {
            return Vec::new();
        };
        let height = self.site.post_height;
        (0..topic.posts)
            .map(|i| {
                let top = i as f64 * height - self.scroll_y;
                ItemBox {
                    id: i + 1,
                    top,
                    bottom: top + height,
                }
            })
            .collect()
    }

    fn viewport_height(&self) -> f64 {
        self.site.viewport
    }

    fn has_like_target(&self) -> bool {
        self.live_topic().is_some_and(|topic| topic.likes > 0)
    }

    fn has_resume_control(&self) -> bool {
        self.live_topic()
            .is_some_and(|topic| topic.last_read > 0 && topic.last_read < topic.posts)
    }
}

impl PageActions for SimPage<'_> {
    fn scroll_by(&mut self, px: u32) {
        self.scroll_y += f64::from(px);
        self.record_progress();
    }

    fn mark_read(&mut self, ids: &[u64]) {
        self.marked += ids.len();
    }

    fn press_like(&mut self) -> bool {
        let Some(index) = self.topic.filter(|_| self.has_like_target()) else {
            return false;
        };
        self.site.topics[index].likes -= 1;
        self.site.likes_given += 1;
        true
    }

    /// 跳到上次读到的楼层
    fn press_resume_control(&mut self) {
        if let Some(topic) = self.live_topic() {
            let target = topic.last_read as f64 * self.site.post_height - self.site.viewport;
            self.scroll_y = self.scroll_y.max(target.max(0.0));
        }
    }

    fn notify(&mut self, message: &str) {
        log::warn!("{}", message);
        self.site.notices.push(message.to_string());
    }
}
