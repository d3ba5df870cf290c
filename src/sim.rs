use anyhow::Result;
use std::fmt;

use crate::context::{LoadEnd, PageContext};
use crate::controller::Notice;
use crate::state::SessionPhase;
use crate::store::KeyValueStore;
use crate::timer::Clock;

pub mod site;

use site::{SimPage, SimSite};

/// 模拟运行参数
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// 第一次加载的页面路径
    pub start_path: String,
    /// 第一次加载后打开阅读开关
    pub start_reading: bool,
    /// 第一次加载后打开点赞开关
    pub start_liking: bool,
    pub max_loads: usize,
    pub max_tasks_per_load: usize,
    /// 两次加载之间的耗时（毫秒）
    pub load_delay_ms: i64,
    /// 随机种子，每次加载在此基础上递增
    pub seed: Option<u64>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            start_path: "/latest".to_string(),
            start_reading: true,
            start_liking: false,
            max_loads: 200,
            max_tasks_per_load: 100_000,
            load_delay_ms: 800,
            seed: None,
        }
    }
}

/// 单次页面加载的记录
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRecord {
    pub path: String,
    pub phase: SessionPhase,
    pub end: LoadEnd,
    pub marked: usize,
    pub notices: Vec<Notice>,
}

impl fmt::Display for LoadRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = match &self.end {
            LoadEnd::Navigated(url) => format!("-> {}", url),
            LoadEnd::Halted => "已停止".to_string(),
            LoadEnd::Idle => "停留".to_string(),
            LoadEnd::Suspended => "未完成".to_string(),
        };
        write!(f, "{:<28} {:<8} {}", self.path, self.phase.text(), end)?;
        if self.marked > 0 {
            write!(f, " (标记 {} 帖)", self.marked)?;
        }
        for notice in &self.notices {
            write!(f, " [{}]", notice.text())?;
        }
        Ok(())
    }
}

/// 模拟运行的结果
#[derive(Debug, Clone)]
pub struct SimReport {
    pub loads: Vec<LoadRecord>,
    pub likes_given: u32,
    pub unread_left: usize,
    pub elapsed_ms: i64,
}

impl SimReport {
    #[cfg(test)]
    pub fn last_end(&self) -> Option<&LoadEnd> {
        self.loads.last().map(|record| &record.end)
    }
}

/// 在模拟站点上连续执行页面加载，直到自动化停下或达到加载次数上限
///
/// 每次加载都新建页面上下文，加载之间只有存储中的内容延续。
pub fn run_simulation(
    site: &mut SimSite,
    store: &mut dyn KeyValueStore,
    clock: &mut dyn Clock,
    options: &SimOptions,
) -> Result<SimReport> {
    let started = clock.now_ms();
    let mut path = options.start_path.clone();
    let mut loads = Vec::new();

    for index in 0..options.max_loads {
        let now = clock.now_ms();
        let seed = options.seed.map(|seed| seed.wrapping_add(index as u64));
        let mut page = SimPage::open(site, &path);
        let mut context = PageContext::open(&mut page, &mut *store, now, seed)?;

        context.on_load(now)?;
        if index == 0 {
            if options.start_liking && !context.state().is_liking {
                context.set_liking(true)?;
            }
            if options.start_reading && !context.state().is_reading {
                context.set_reading(true, now)?;
            }
        }

        let end = context.run(clock, options.max_tasks_per_load)?;
        let phase = context.phase();
        let notices = context.notices().to_vec();
        let base_url = context.config().base_url.clone();
        drop(context);

        let record = LoadRecord {
            path: path.clone(),
            phase,
            end: end.clone(),
            marked: page.marked(),
            notices,
        };
        log::debug!("{}", record);
        loads.push(record);

        match end {
            LoadEnd::Navigated(url) => {
                path = url
                    .strip_prefix(base_url.as_str())
                    .filter(|rest| rest.starts_with('/'))
                    .unwrap_or(url.as_str())
                    .to_string();
                clock.wait_until(clock.now_ms() + options.load_delay_ms);
            }
            LoadEnd::Halted | LoadEnd::Idle | LoadEnd::Suspended => break,
        }
    }

    Ok(SimReport {
        loads,
        likes_given: site.likes_given,
        unread_left: site.unread_count(),
        elapsed_ms: clock.now_ms() - started,
    })
}
