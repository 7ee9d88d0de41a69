//! FreshKeeper CLI
//!
//! 监控易腐物品的过期时间，在变质前提醒

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use freshkeeper::bridge::{decode_push, SystemWindows, WorkerEvent};
use freshkeeper::notification::{
    Branding, ConsoleSink, DeliveryOutcome, DeliveryReport, MemorySink, NotificationSink,
    StaticPermission,
};
use freshkeeper::{
    days_until, BackgroundChannelBridge, ExpiryMonitor, ExpiryScanner, ExpiryThresholds,
    JsonItemSource, MemoryItemSource, MonitorCommand, MonitorConfig, MonitorEvent,
    PermissionState,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "freshkeeper")]
#[command(about = "FreshKeeper - 易腐物品过期监控与提醒")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.config/freshkeeper/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 持续监控物品并发送提醒
    Watch {
        /// 物品 JSON 文件
        #[arg(long)]
        items: PathBuf,
        /// 扫描间隔（秒，至少为 1）
        #[arg(long, short, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
        /// 会话用户
        #[arg(long, default_value = "local")]
        user: String,
        /// 只记录，不实际发送通知
        #[arg(long)]
        dry_run: bool,
        /// 启用触摸手势
        #[arg(long)]
        touch: bool,
        /// 通知输出到终端
        #[arg(long)]
        console: bool,
    },
    /// 扫描一次并列出需要提醒的物品
    Scan {
        /// 物品 JSON 文件
        #[arg(long)]
        items: PathBuf,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
        /// 提醒窗口（天）
        #[arg(long)]
        horizon: Option<i64>,
    },
    /// 计算过期时间的紧急程度
    Classify {
        /// RFC 3339 时间或 YYYY-MM-DD
        expiry: String,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 发送一条测试通知
    TestNotify {
        /// 只记录，不实际发送通知
        #[arg(long)]
        dry_run: bool,
        /// 通知输出到终端
        #[arg(long)]
        console: bool,
    },
    /// 通过后台 worker 展示一条推送
    Push {
        /// 推送负载 JSON，例如 {"title":"...","body":"...","tag":"..."}
        payload: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug freshkeeper watch --items items.json
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("freshkeeper=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => MonitorConfig::load_from(path)?,
        None => MonitorConfig::load()?,
    };

    match cli.command {
        Commands::Watch {
            items,
            interval,
            user,
            dry_run,
            touch,
            console,
        } => {
            let mut config = config;
            if let Some(interval) = interval {
                config.scan_interval_secs = interval;
            }
            config.touch_presentation |= touch;
            watch(config, items, user, dry_run, console).await?;
        }
        Commands::Scan {
            items,
            json,
            horizon,
        } => {
            let thresholds = match horizon {
                Some(days) => ExpiryThresholds {
                    critical_days: config.critical_days.min(days),
                    warning_days: days,
                },
                None => config.thresholds(),
            };
            let scanner = ExpiryScanner::new(thresholds);
            let report = scanner.scan_source(&JsonItemSource::new(items), Utc::now())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "扫描 {} 个物品，{} 个需要提醒，{} 个已过期:\n",
                    report.scanned,
                    report.alertable.len(),
                    report.expired.len()
                );
                for entry in &report.alertable {
                    println!(
                        "  [{}] {} | 分类: {} | 剩余 {} 天",
                        entry.tier, entry.item.name, entry.item.category, entry.days_left
                    );
                }
                for item in &report.expired {
                    println!("  [expired] {} | 过期时间: {}", item.name, item.expiry_date);
                }
            }
        }
        Commands::Classify { expiry, json } => {
            let expiry = parse_expiry(&expiry)?;
            let now = Utc::now();
            let days = days_until(expiry, now);
            let tier = config.thresholds().classify_days(days);

            if json {
                println!(
                    "{}",
                    serde_json::json!({ "tier": tier, "days": days, "expiry": expiry })
                );
            } else {
                println!("{} (剩余 {} 天)", tier, days);
            }
        }
        Commands::TestNotify { dry_run, console } => {
            let mut builder = ExpiryMonitor::builder(config)
                .source(Arc::new(MemoryItemSource::default()))
                .dry_run(dry_run);
            if console {
                builder = builder.sink(Arc::new(ConsoleSink::new()));
            }
            if dry_run {
                builder = builder
                    .sink(Arc::new(MemorySink::new("dry-run")))
                    .permission(Arc::new(StaticPermission::granted()));
            }
            let mut monitor = builder.build()?;
            let report = monitor.test_notification().await;
            print_report(&report);
            monitor.shutdown();
        }
        Commands::Push { payload } => {
            if decode_push(&payload).is_none() {
                println!("推送负载为空，已忽略");
                return Ok(());
            }

            let branding = Branding::from(&config);
            let sink: Arc<dyn NotificationSink> =
                match freshkeeper::notification::DesktopSink::detect(&branding.app_name) {
                    Some(sink) => Arc::new(sink),
                    None => Arc::new(ConsoleSink::new()),
                };
            let (tx, _rx) = mpsc::unbounded_channel();
            let bridge = BackgroundChannelBridge::new(
                sink,
                Arc::new(SystemWindows::new(config.app_origin.clone())),
                tx,
                branding,
            );
            bridge.register();
            bridge
                .post(WorkerEvent::Push(payload))
                .map_err(|e| anyhow!("{}", e))?;
            if let Some(worker) = bridge.unregister() {
                worker.await?;
            }
            println!("已推送");
        }
    }

    Ok(())
}

async fn watch(
    config: MonitorConfig,
    items: PathBuf,
    user: String,
    dry_run: bool,
    console: bool,
) -> Result<()> {
    let mut builder = ExpiryMonitor::builder(config)
        .source(Arc::new(JsonItemSource::new(&items)))
        .dry_run(dry_run);
    if console {
        builder = builder.sink(Arc::new(ConsoleSink::new()));
    }
    if dry_run {
        builder = builder
            .sink(Arc::new(MemorySink::new("dry-run")))
            .permission(Arc::new(StaticPermission::new(PermissionState::Granted)));
    }

    let mut monitor = builder.build()?;
    let mut events = monitor.subscribe();

    // 权限请求可能需要终端交互，在读取命令之前完成
    monitor.start_session(&user).await;
    eprintln!(
        "FreshKeeper 启动，物品文件: {}，通知权限: {}",
        items.display(),
        monitor.permission()
    );
    eprintln!("命令: scan | close <toast> | view <toast> | dismiss <alert> | remove <item> | consume <item> | test | logout | login <user> | quit");

    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    });

    let stdin_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<MonitorCommand>() {
                Ok(command) => {
                    if stdin_tx.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("❌ {}", e),
            }
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down");
            let _ = tx.send(MonitorCommand::Shutdown).await;
        }
    });

    monitor.run(rx).await
}

fn parse_expiry(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| anyhow!("无法解析过期时间: {}", input))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow!("无法解析过期时间: {}", input))
}

fn print_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::AlertRaised(alert) => {
            println!("🍎 [{}] {} ({})", alert.tier, alert.message, alert.id);
        }
        MonitorEvent::ToastShown(id) => println!("  ↳ toast 已展示: {}", id),
        MonitorEvent::ToastRemoved(removed) => println!("  ↳ toast 已移除: {}", removed.toast_id),
        MonitorEvent::Delivered { alert_id, report } => match &report.outcome {
            DeliveryOutcome::Delivered { tier } => {
                println!("  ↳ 通知已发送 ({}): {}", tier, alert_id)
            }
            DeliveryOutcome::PermissionBlocked(state) => {
                println!("  ↳ 通知权限为 {}，只显示 toast", state)
            }
            DeliveryOutcome::Exhausted => warn!(alert_id = %alert_id, "All delivery tiers failed"),
            DeliveryOutcome::DryRun => println!("  ↳ [DRY-RUN] {}", alert_id),
        },
        MonitorEvent::SessionEnded => println!("会话已结束"),
    }
}

fn print_report(report: &DeliveryReport) {
    match &report.outcome {
        DeliveryOutcome::Delivered { tier } => println!("测试通知已发送 ({})", tier),
        DeliveryOutcome::PermissionBlocked(state) => {
            println!("通知权限为 {}，请在系统设置中允许通知", state)
        }
        DeliveryOutcome::Exhausted => println!("❌ 所有通知方式均失败"),
        DeliveryOutcome::DryRun => println!("[DRY-RUN] 测试通知未实际发送"),
    }
    for (tier, result) in &report.attempts {
        println!("  {}: {:?}", tier, result);
    }
}
