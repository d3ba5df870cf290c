mod config;
mod context;
mod controller;
mod controls;
mod like;
mod model;
mod page;
mod scroll;
mod sim;
mod state;
mod store;
mod timer;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::ReaderConfig;
use crate::controls::{StatusReport, Switch};
use crate::sim::site::SimSite;
use crate::sim::{SimOptions, run_simulation};
use crate::store::{FileStore, KeyValueStore, MemoryStore};
use crate::timer::{Clock, ManualClock, SystemClock};

#[derive(Parser)]
#[command(name = "ar", version, author = "haukuen")]
#[command(about = "Unattended reading-queue traversal driven by persisted state")]
struct Cli {
    /// 存储文件路径，默认 ~/.auto_read/store.json
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 显示状态面板
    Status {
        /// 按 statusUpdateIntervalMs 持续刷新
        #[arg(long)]
        watch: bool,
    },
    /// 开始或停止阅读
    Read {
        #[arg(value_enum, default_value = "toggle")]
        switch: Switch,
    },
    /// 启用或禁用自动点赞
    Like {
        #[arg(value_enum, default_value = "toggle")]
        switch: Switch,
    },
    /// 重置未读列表和阅读状态（保留今日点赞计数）
    Reset,
    /// 显示或隐藏状态面板
    Panel,
    /// 查看或修改运行配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// 在站点描述文件上模拟多次页面加载
    Simulate {
        /// 站点描述 JSON 文件
        site: PathBuf,
        /// 第一次加载的页面路径
        #[arg(long, default_value = "/latest")]
        start: String,
        /// 同时启用自动点赞
        #[arg(long)]
        like: bool,
        /// 最多加载多少次页面
        #[arg(long, default_value_t = 200)]
        max_loads: usize,
        /// 随机种子，用于复现点赞间隔
        #[arg(long)]
        seed: Option<u64>,
        /// 使用内存存储，不修改存储文件
        #[arg(long)]
        ephemeral: bool,
        /// 按真实时间运行
        #[arg(long)]
        realtime: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// 打印当前配置
    Show,
    /// 修改单个配置项
    Set { key: String, value: String },
    /// 恢复默认配置
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Simulate { .. } => "info",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let store_path = cli.store.unwrap_or_else(FileStore::default_path);
    run(cli.command, store_path)
}

fn open_store(path: &Path) -> Result<FileStore> {
    FileStore::open(path).with_context(|| format!("打开存储失败: {}", path.display()))
}

fn run(command: Commands, store_path: PathBuf) -> Result<()> {
    match command {
        Commands::Status { watch } => show_status(&store_path, watch),
        Commands::Read { switch } => {
            let mut store = open_store(&store_path)?;
            let reading = controls::set_reading(&mut store, switch)?;
            println!("{}", if reading { "阅读已开始" } else { "阅读已停止" });
            Ok(())
        }
        Commands::Like { switch } => {
            let mut store = open_store(&store_path)?;
            let liking = controls::set_liking(&mut store, switch)?;
            println!("{}", if liking { "点赞已启用" } else { "点赞已禁用" });
            Ok(())
        }
        Commands::Reset => {
            let mut store = open_store(&store_path)?;
            controls::reset_state(&mut store)?;
            println!("未读列表已重置");
            Ok(())
        }
        Commands::Panel => {
            let mut store = open_store(&store_path)?;
            let hidden = controls::toggle_panel(&mut store)?;
            println!("{}", if hidden { "状态面板已隐藏" } else { "状态面板已显示" });
            Ok(())
        }
        Commands::Config { action } => run_config(action, &store_path),
        Commands::Simulate {
            site,
            start,
            like,
            max_loads,
            seed,
            ephemeral,
            realtime,
        } => {
            let mut site = SimSite::load(&site).context("加载站点描述失败")?;
            let options = SimOptions {
                start_path: start,
                start_liking: like,
                max_loads,
                seed,
                ..SimOptions::default()
            };

            let mut store: Box<dyn KeyValueStore> = if ephemeral {
                Box::new(MemoryStore::new())
            } else {
                Box::new(open_store(&store_path)?)
            };
            let mut clock: Box<dyn Clock> = if realtime {
                Box::new(SystemClock)
            } else {
                Box::new(ManualClock::new(SystemClock.now_ms()))
            };

            let report = run_simulation(&mut site, store.as_mut(), clock.as_mut(), &options)
                .context("模拟运行失败")?;

            for (index, record) in report.loads.iter().enumerate() {
                println!("{:>4}  {}", index + 1, record);
            }
            println!();
            println!(
                "加载 {} 次，点赞 {} 次，剩余未读 {} 帖，用时 {:.1}s",
                report.loads.len(),
                report.likes_given,
                report.unread_left,
                report.elapsed_ms as f64 / 1000.0
            );
            println!();
            println!("{}", StatusReport::collect(&*store, clock.now_ms()));
            Ok(())
        }
    }
}

fn run_config(action: ConfigAction, store_path: &Path) -> Result<()> {
    let mut store = open_store(store_path)?;
    let config = match action {
        ConfigAction::Show => ReaderConfig::load(&store),
        ConfigAction::Set { key, value } => controls::set_config(&mut store, &key, &value)
            .with_context(|| format!("修改配置 {} 失败", key))?,
        ConfigAction::Reset => controls::reset_config(&mut store)?,
    };
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn show_status(store_path: &Path, watch: bool) -> Result<()> {
    let mut clock = SystemClock;
    loop {
        // 每次重新读取文件，其他进程的写入随即可见
        let store = open_store(store_path)?;
        let report = StatusReport::collect(&store, clock.now_ms());
        println!("{}", controls::render_status(&report));
        if !watch {
            return Ok(());
        }

        let due = ReaderConfig::load(&store).next_status_refresh(clock.now_ms());
        clock.wait_until(due);
        println!();
        log::debug!("Refreshing status from {}", store.path().display());
    }
}
