//! 监控循环的输入命令与输出事件

use crate::expiry::{Alert, AlertId};
use crate::notification::DeliveryReport;
use crate::toast::{ToastId, ToastRemoved};

/// 外部发给监控循环的命令
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorCommand {
    /// 登录
    StartSession { user: String },
    /// 登出
    EndSession,
    /// 立即扫描一次
    Scan,
    RemoveItem(String),
    ConsumeItem(String),
    DismissAlert(AlertId),
    CloseToast(ToastId),
    ViewToast(ToastId),
    TouchStart { toast_id: ToastId, y: f64 },
    TouchMove { toast_id: ToastId, y: f64 },
    TouchEnd { toast_id: ToastId },
    TestNotification,
    Shutdown,
}

/// 监控循环对外发出的事件
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    AlertRaised(Alert),
    ToastShown(ToastId),
    ToastRemoved(ToastRemoved),
    Delivered {
        alert_id: AlertId,
        report: DeliveryReport,
    },
    SessionEnded,
}

impl std::str::FromStr for MonitorCommand {
    type Err = anyhow::Error;

    /// 解析交互命令，例如 `close toast-exp-42`、`remove 42`
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty command"))?;
        let arg = parts.next();
        let require = |arg: Option<&str>| {
            arg.map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("{} requires an argument", verb))
        };

        let command = match verb {
            "login" => MonitorCommand::StartSession {
                user: require(arg)?,
            },
            "logout" => MonitorCommand::EndSession,
            "scan" => MonitorCommand::Scan,
            "remove" => MonitorCommand::RemoveItem(require(arg)?),
            "consume" => MonitorCommand::ConsumeItem(require(arg)?),
            "dismiss" => MonitorCommand::DismissAlert(AlertId::from(require(arg)?.as_str())),
            "close" => MonitorCommand::CloseToast(ToastId::from(require(arg)?.as_str())),
            "view" => MonitorCommand::ViewToast(ToastId::from(require(arg)?.as_str())),
            "test" => MonitorCommand::TestNotification,
            "quit" | "exit" => MonitorCommand::Shutdown,
            other => anyhow::bail!("unknown command: {}", other),
        };
        Ok(command)
    }
}
