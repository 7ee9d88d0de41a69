//! 过期监控主循环
//!
//! 单个 tokio 任务拥有全部会话状态：去重记录、未处理的提醒、toast 队列与扫描定时器。
//! 后台 worker 只通过 `BridgeMessage` 回传，外部只能通过 `MonitorCommand` 修改状态。
//!
//! ```text
//! 物品快照 → ExpiryScanner → AlertDeduper → {ToastQueue, NotificationDispatcher}
//!                                   ↑                      │
//!                                   └──── 确认（查看 / 关闭 / 删除 / 登出）
//! ```

mod builder;
mod command;

pub use builder::MonitorBuilder;
pub use command::{MonitorCommand, MonitorEvent};

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::bridge::{focus_or_open, BackgroundChannelBridge, BridgeMessage, ClientWindows};
use crate::config::MonitorConfig;
use crate::expiry::{Alert, AlertDeduper, AlertId, ExpiryScanner};
use crate::item::{Item, ItemSource};
use crate::notification::{DeliveryReport, NotificationDispatcher, PermissionState};
use crate::scheduler::Scheduler;
use crate::toast::{DragOutcome, ToastChange, ToastId, ToastQueue, ToastTimer};

/// 会话级定时事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTimer {
    Scan,
}

/// 主循环被唤醒的原因
#[derive(Debug)]
enum Wake {
    Scan,
    Toast(ToastTimer),
    Bridge(BridgeMessage),
}

/// 过期监控
pub struct ExpiryMonitor {
    config: MonitorConfig,
    source: Arc<dyn ItemSource>,
    scanner: ExpiryScanner,
    deduper: AlertDeduper,
    /// 未处理的提醒，按产生顺序
    alerts: Vec<Alert>,
    /// 最近一次扫描的过期物品（仅展示）
    expired: Vec<Item>,
    toasts: ToastQueue,
    dispatcher: NotificationDispatcher,
    bridge: Arc<BackgroundChannelBridge>,
    bridge_rx: mpsc::UnboundedReceiver<BridgeMessage>,
    windows: Arc<dyn ClientWindows>,
    timers: Scheduler<SessionTimer>,
    session: Option<String>,
    events: Option<mpsc::UnboundedSender<MonitorEvent>>,
}

impl ExpiryMonitor {
    pub fn builder(config: MonitorConfig) -> MonitorBuilder {
        MonitorBuilder::new(config)
    }

    fn new(
        config: MonitorConfig,
        source: Arc<dyn ItemSource>,
        dispatcher: NotificationDispatcher,
        bridge: Arc<BackgroundChannelBridge>,
        bridge_rx: mpsc::UnboundedReceiver<BridgeMessage>,
        windows: Arc<dyn ClientWindows>,
    ) -> Self {
        Self {
            scanner: ExpiryScanner::new(config.thresholds()),
            toasts: ToastQueue::new(config.toast_timing()),
            config,
            source,
            deduper: AlertDeduper::new(),
            alerts: Vec::new(),
            expired: Vec::new(),
            dispatcher,
            bridge,
            bridge_rx,
            windows,
            timers: Scheduler::new(),
            session: None,
            events: None,
        }
    }

    /// 订阅监控事件（只保留最后一个订阅者）
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<MonitorEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    // ========================================================================
    // 会话
    // ========================================================================

    /// 登录：请求一次权限、注册后台 worker、安排扫描
    ///
    /// 同一用户重复调用不做任何事；切换用户时先结束旧会话。
    pub async fn start_session(&mut self, user: &str) -> bool {
        match self.session.as_deref() {
            Some(current) if current == user => {
                debug!(user = %user, "Session already active");
                return false;
            }
            Some(_) => self.end_session(),
            None => {}
        }

        self.session = Some(user.to_string());
        let permission = self.dispatcher.permission().request_on_session_start().await;
        self.bridge.register();

        let now = Instant::now();
        let interval = self.config.scan_interval();
        self.timers
            .schedule_at(now, self.config.settle_delay(), SessionTimer::Scan);
        self.timers
            .schedule_every(now, interval, interval, SessionTimer::Scan);

        info!(
            user = %user,
            permission = %permission,
            interval_secs = interval.as_secs(),
            "Session started"
        );
        true
    }

    /// 登出：取消所有定时器，清空提醒、toast 与去重记录
    pub fn end_session(&mut self) {
        let Some(user) = self.session.take() else {
            return;
        };

        self.timers.cancel_all();
        self.toasts.clear();
        self.alerts.clear();
        self.expired.clear();
        self.deduper.clear_all();

        info!(user = %user, "Session ended");
        self.emit(MonitorEvent::SessionEnded);
    }

    /// 关闭监控
    pub fn shutdown(&mut self) {
        self.end_session();
        self.bridge.unregister();
    }

    // ========================================================================
    // 扫描
    // ========================================================================

    /// 扫描一次，返回新产生的提醒
    pub async fn run_scan(&mut self) -> Result<Vec<Alert>> {
        self.run_scan_at(Utc::now()).await
    }

    pub async fn run_scan_at(&mut self, now: DateTime<Utc>) -> Result<Vec<Alert>> {
        if self.session.is_none() {
            debug!("No active session, scan skipped");
            return Ok(Vec::new());
        }

        let report = self.scanner.scan_source(self.source.as_ref(), now)?;
        self.expired = report.expired.clone();

        let mut raised = Vec::new();
        for candidate in &report.alertable {
            if !self.deduper.should_alert(&candidate.item.id) {
                continue;
            }
            self.deduper.mark_alerted(&candidate.item.id);
            let alert = Alert::new(&candidate.item, candidate.tier, now);
            debug!(item_id = %alert.item_id, tier = %alert.tier, "Alert raised");
            self.alerts.push(alert.clone());
            self.emit(MonitorEvent::AlertRaised(alert.clone()));
            raised.push(alert);
        }

        self.toasts.enqueue(&raised);

        for alert in &raised {
            self.deliver(alert).await;
        }

        info!(
            scanned = report.scanned,
            alertable = report.alertable.len(),
            new_alerts = raised.len(),
            expired = report.expired.len(),
            "Scan complete"
        );
        Ok(raised)
    }

    /// 投递前重新确认提醒和物品仍然存在
    async fn deliver(&mut self, alert: &Alert) {
        if !self.is_outstanding(&alert.id) {
            debug!(alert_id = %alert.id, "Alert retired before delivery");
            return;
        }

        match self.source.contains(&alert.item_id) {
            Ok(true) => {}
            Ok(false) => {
                info!(item_id = %alert.item_id, "Item removed before delivery");
                self.retire_item(&alert.item_id);
                return;
            }
            Err(e) => {
                warn!(item_id = %alert.item_id, error = %e, "Failed to re-check item");
            }
        }

        let report = self.dispatcher.dispatch(alert).await;
        self.emit(MonitorEvent::Delivered {
            alert_id: alert.id.clone(),
            report,
        });
    }

    // ========================================================================
    // 确认
    // ========================================================================

    /// 物品被删除
    pub fn remove_item(&mut self, item_id: &str) {
        info!(item_id = %item_id, "Item removed");
        self.retire_item(item_id);
    }

    /// 物品被标记为已使用
    pub fn consume_item(&mut self, item_id: &str) {
        info!(item_id = %item_id, "Item consumed");
        self.retire_item(item_id);
    }

    /// 用户显式清除提醒：该物品之后可以重新提醒
    pub fn dismiss_alert(&mut self, alert_id: &AlertId) -> bool {
        let Some(pos) = self.alerts.iter().position(|a| &a.id == alert_id) else {
            return false;
        };
        let alert = self.alerts.remove(pos);
        self.deduper.clear(&alert.item_id);
        self.toasts.dismiss(&ToastId::for_alert(&alert.id));
        info!(item_id = %alert.item_id, "Alert dismissed");
        true
    }

    /// 关闭 toast；不清除去重记录
    pub fn close_toast(&mut self, toast_id: &ToastId) -> bool {
        self.toasts.close(toast_id)
    }

    /// 查看：关闭所有 toast 并聚焦应用
    pub async fn view_toast(&mut self, toast_id: &ToastId) -> bool {
        if !self.toasts.contains(toast_id) {
            return false;
        }
        let closed = self.toasts.close_all_at(Instant::now());
        debug!(toast_id = %toast_id, closed, "Toast viewed");
        self.focus_app().await;
        true
    }

    pub fn touch_start(&mut self, toast_id: &ToastId, y: f64) -> bool {
        self.toasts.touch_start(toast_id, y)
    }

    pub fn touch_move(&mut self, toast_id: &ToastId, y: f64) {
        self.toasts.touch_move(toast_id, y);
    }

    pub fn touch_end(&mut self, toast_id: &ToastId) -> Option<DragOutcome> {
        self.toasts.touch_end(toast_id)
    }

    /// 测试通知：显式重试权限请求后发送
    pub async fn test_notification(&mut self) -> DeliveryReport {
        self.bridge.register();
        self.dispatcher.test_notification().await
    }

    fn retire_item(&mut self, item_id: &str) {
        self.deduper.clear(item_id);
        self.alerts.retain(|a| a.item_id != item_id);
        self.toasts.remove_for_item(item_id);
    }

    /// 提醒已被确认；去重记录保持不变
    fn acknowledge(&mut self, alert_id: &AlertId) {
        self.alerts.retain(|a| &a.id != alert_id);
    }

    async fn focus_app(&self) {
        if let Err(e) = focus_or_open(self.windows.as_ref(), &self.config.app_url).await {
            warn!(error = %e, "Failed to focus application");
        }
    }

    // ========================================================================
    // 事件循环
    // ========================================================================

    /// 等待并处理下一个事件（扫描、toast 定时器或后台消息）
    pub async fn step(&mut self) {
        let wake = self.wait().await;
        self.handle_wake(wake).await;
    }

    /// 运行直到收到 `Shutdown` 或命令通道关闭
    pub async fn run(mut self, mut commands: mpsc::Receiver<MonitorCommand>) -> Result<()> {
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(MonitorCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                wake = self.wait() => self.handle_wake(wake).await,
            }
        }

        self.shutdown();
        info!("Monitor stopped");
        Ok(())
    }

    pub async fn handle_command(&mut self, command: MonitorCommand) {
        match command {
            MonitorCommand::StartSession { user } => {
                self.start_session(&user).await;
            }
            MonitorCommand::EndSession => self.end_session(),
            MonitorCommand::Scan => {
                if let Err(e) = self.run_scan().await {
                    warn!(error = %e, "Scan failed");
                }
            }
            MonitorCommand::RemoveItem(item_id) => self.remove_item(&item_id),
            MonitorCommand::ConsumeItem(item_id) => self.consume_item(&item_id),
            MonitorCommand::DismissAlert(alert_id) => {
                self.dismiss_alert(&alert_id);
            }
            MonitorCommand::CloseToast(toast_id) => {
                self.close_toast(&toast_id);
            }
            MonitorCommand::ViewToast(toast_id) => {
                self.view_toast(&toast_id).await;
            }
            MonitorCommand::TouchStart { toast_id, y } => {
                self.touch_start(&toast_id, y);
            }
            MonitorCommand::TouchMove { toast_id, y } => self.touch_move(&toast_id, y),
            MonitorCommand::TouchEnd { toast_id } => {
                self.touch_end(&toast_id);
            }
            MonitorCommand::TestNotification => {
                let report = self.test_notification().await;
                info!(outcome = ?report.outcome, "Test notification");
            }
            MonitorCommand::Shutdown => self.shutdown(),
        }
    }

    /// 只等待可安全取消的事件源，处理放在 select 之外
    async fn wait(&mut self) -> Wake {
        tokio::select! {
            biased;
            Some(message) = self.bridge_rx.recv() => Wake::Bridge(message),
            _ = self.timers.next() => Wake::Scan,
            timer = self.toasts.next_timer() => Wake::Toast(timer),
        }
    }

    async fn handle_wake(&mut self, wake: Wake) {
        match wake {
            Wake::Scan => {
                if let Err(e) = self.run_scan().await {
                    warn!(error = %e, "Scheduled scan failed");
                }
            }
            Wake::Toast(timer) => {
                if let Some(change) = self.toasts.handle_timer(timer, Instant::now()) {
                    self.on_toast_change(change);
                }
            }
            Wake::Bridge(message) => self.on_bridge_message(message).await,
        }
    }

    fn on_toast_change(&mut self, change: ToastChange) {
        match change {
            ToastChange::Shown(id) => self.emit(MonitorEvent::ToastShown(id)),
            ToastChange::Removed(removed) => {
                // 自动消失只移除 toast，提醒仍然保留，直到用户处理
                if removed.cause.is_user_action() {
                    self.acknowledge(&removed.alert_id);
                }
                self.emit(MonitorEvent::ToastRemoved(removed));
            }
        }
    }

    async fn on_bridge_message(&mut self, message: BridgeMessage) {
        match message {
            BridgeMessage::ViewRequested { item_id, url } => {
                debug!(item_id = ?item_id, url = %url, "View requested from notification");
                if let Some(item_id) = item_id {
                    let alert_id = AlertId::for_item(&item_id);
                    self.acknowledge(&alert_id);
                }
                self.toasts.close_all_at(Instant::now());
            }
            BridgeMessage::CloseAcknowledged { tag } => {
                debug!(tag = ?tag, "Notification close acknowledged");
                if let Some(tag) = tag {
                    self.alerts.retain(|a| a.tag() != tag);
                }
            }
        }
    }

    fn emit(&mut self, event: MonitorEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                self.events = None;
            }
        }
    }

    // ========================================================================
    // 查询
    // ========================================================================

    fn is_outstanding(&self, alert_id: &AlertId) -> bool {
        self.alerts.iter().any(|a| &a.id == alert_id)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_user(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// 未处理的提醒
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    /// 最近一次扫描的过期物品
    pub fn expired_items(&self) -> &[Item] {
        &self.expired
    }

    pub fn deduper(&self) -> &AlertDeduper {
        &self.deduper
    }

    pub fn permission(&self) -> PermissionState {
        self.dispatcher.permission().state()
    }

    pub fn bridge(&self) -> &Arc<BackgroundChannelBridge> {
        &self.bridge
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// 等待中的会话定时器数量
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for ExpiryMonitor {
    fn drop(&mut self) {
        self.bridge.unregister();
    }
}
