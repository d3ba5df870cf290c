use crate::config::CONFIG;

#[cfg(test)]
pub mod fake;

/// 页面类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// 未读列表页
    UnseenList,
    /// 帖子详情页
    PostDetail,
    /// 找不到页面
    ErrorPage,
    Other,
}

/// 页面中一个帖子的位置，相对视口
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemBox {
    pub id: u64,
    pub top: f64,
    pub bottom: f64,
}

impl ItemBox {
    /// 元素完全位于视口内
    pub fn fully_visible(&self, viewport_height: f64) -> bool {
        self.top >= 0.0 && self.bottom <= viewport_height
    }
}

/// 对当前已渲染页面的只读访问
pub trait PageObserver {
    fn path(&self) -> String;
    fn title(&self) -> String;
    /// 未读列表中的帖子链接，按页面顺序
    fn unseen_links(&self) -> Vec<String>;
    /// 是否存在帖子容器
    fn has_post_marker(&self) -> bool;
    /// 回复进度文本，如 "3 / 12"
    fn reply_progress(&self) -> Option<String>;
    fn items(&self) -> Vec<ItemBox>;
    fn viewport_height(&self) -> f64;
    /// 是否还有未点赞的按钮
    fn has_like_target(&self) -> bool;
    /// 是否存在"返回上一个未读帖子"按钮
    fn has_resume_control(&self) -> bool;
}

/// 对当前页面的操作
pub trait PageActions {
    fn scroll_by(&mut self, px: u32);
    fn mark_read(&mut self, ids: &[u64]);
    /// 点击下一个未点赞的按钮，没有可点的目标时返回 false
    fn press_like(&mut self) -> bool;
    fn press_resume_control(&mut self);
    fn notify(&mut self, message: &str);
}

/// 宿主页面：可观察也可操作
pub trait Page: PageObserver + PageActions {}

impl<T: PageObserver + PageActions> Page for T {}

/// 判断当前页面类型
///
/// 404 标题只在阅读中才检查，且优先于其他判断。
pub fn classify<P: PageObserver + ?Sized>(page: &P, reading: bool) -> PageKind {
    if reading && page.title().contains(CONFIG.not_found_marker) {
        return PageKind::ErrorPage;
    }
    if page.path() == CONFIG.unseen_path {
        return PageKind::UnseenList;
    }
    if page.has_post_marker() {
        return PageKind::PostDetail;
    }
    PageKind::Other
}

/// 状态机所需的页面快照
#[derive(Debug, Clone, PartialEq)]
pub struct PageObservation {
    pub kind: PageKind,
    pub unseen_links: Vec<String>,
    pub has_resume_control: bool,
}

impl PageObservation {
    pub fn capture<P: PageObserver + ?Sized>(page: &P, reading: bool) -> Self {
        let kind = classify(page, reading);
        let unseen_links = if kind == PageKind::UnseenList {
            page.unseen_links()
        } else {
            Vec::new()
        };

        Self {
            kind,
            unseen_links,
            has_resume_control: kind == PageKind::PostDetail && page.has_resume_control(),
        }
    }

    #[cfg(test)]
    pub fn of_kind(kind: PageKind) -> Self {
        Self {
            kind,
            unseen_links: Vec::new(),
            has_resume_control: false,
        }
    }
}
