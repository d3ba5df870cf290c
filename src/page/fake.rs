use super::{ItemBox, PageActions, PageObserver};

/// 测试用页面替身，记录所有操作
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub path: String,
    pub title: String,
    pub links: Vec<String>,
    pub post_marker: bool,
    /// 固定的进度文本；为 None 时按滚动位置计算
    pub progress: Option<String>,
    pub post_count: u64,
    pub post_height: f64,
    pub viewport: f64,
    pub scroll_y: f64,
    pub like_targets: u32,
    pub resume_control: bool,

    pub scrolled: Vec<u32>,
    pub marked: Vec<u64>,
    pub likes_pressed: u32,
    pub resume_pressed: u32,
    pub notices: Vec<String>,
}

impl FakePage {
    pub fn blank(path: &str) -> Self {
        Self {
            path: path.to_string(),
            title: "LINUX DO".to_string(),
            post_height: 300.0,
            viewport: 900.0,
            ..Self::default()
        }
    }

    pub fn unseen(links: &[&str]) -> Self {
        Self {
            links: links.iter().map(|l| l.to_string()).collect(),
            ..Self::blank("/unseen")
        }
    }

    pub fn topic(path: &str, posts: u64) -> Self {
        Self {
            post_marker: true,
            post_count: posts,
            ..Self::blank(path)
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self {
            title: "找不到页面 - LINUX DO".to_string(),
            ..Self::blank(path)
        }
    }

    fn seen_posts(&self) -> u64 {
        let bottom = self.scroll_y + self.viewport;
        ((bottom / self.post_height).floor() as u64).min(self.post_count)
    }
}

impl PageObserver for FakePage {
    fn path(&self) -> String {
        self.path.clone()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn unseen_links(&self) -> Vec<String> {
        self.links.clone()
    }

    fn has_post_marker(&self) -> bool {
        self.post_marker
    }

    fn reply_progress(&self) -> Option<String> {
        if let Some(text) = &self.progress {
            return Some(text.clone());
        }
        self.post_marker
            .then(|| format!("{} / {}", self.seen_posts(), self.post_count))
    }

    fn items(&self) -> Vec<ItemBox> {
        (0..self.post_count)
            .map(|i| {
                let top = i as f64 * self.post_height - self.scroll_y;
                ItemBox {
                    id: i + 1,
                    top,
                    bottom: top + self.post_height,
                }
            })
            .collect()
    }

    fn viewport_height(&self) -> f64 {
        self.viewport
    }

    fn has_like_target(&self) -> bool {
        self.like_targets > 0
    }

    fn has_resume_control(&self) -> bool {
        self.resume_control
    }
}

impl PageActions for FakePage {
    fn scroll_by(&mut self, px: u32) {
        self.scrolled.push(px);
        self.scroll_y += f64::from(px);
    }

    fn mark_read(&mut self, ids: &[u64]) {
        for id in ids {
            if !self.marked.contains(id) {
                self.marked.push(*id);
            }
        }
    }

    fn press_like(&mut self) -> bool {
        if self.like_targets == 0 {
            return false;
        }
        self.like_targets -= 1;
        self.likes_pressed += 1;
        true
    }

    fn press_resume_control(&mut self) {
        self.resume_pressed += 1;
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}
