//! Toast 队列 - 不依赖通知权限的页面内提醒
//!
//! # 状态机
//! ```text
//! Pending --(插入, index × stagger)--> Entering --(settle)--> Visible
//! Visible --(auto_dismiss | close | 下拉关闭)--> Exiting --(exit)--> Removed
//! ```
//!
//! 所有定时器由队列自己的 `Scheduler` 持有，`clear` 时一起取消。

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use super::gesture::{DragGesture, DragOutcome};
use crate::config::ToastTiming;
use crate::expiry::{Alert, AlertId};
use crate::scheduler::{Scheduler, TimerHandle};

/// Toast ID，由提醒 ID 派生，同一提醒不会出现两个 toast
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToastId(String);

impl ToastId {
    pub fn for_alert(alert_id: &AlertId) -> Self {
        Self(format!("toast-{}", alert_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ToastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ToastId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// 展示状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationState {
    /// 等待错峰插入
    Pending,
    /// 已插入，入场动画中
    Entering,
    Visible,
    /// 退出动画中
    Exiting,
    Removed,
}

/// 队列中的一条 toast
#[derive(Debug, Clone)]
pub struct ToastEntry {
    pub id: ToastId,
    pub alert: Alert,
    pub state: PresentationState,
    gesture: Option<DragGesture>,
    timer: Option<TimerHandle>,
    visible_since: Option<Instant>,
    exit_cause: Option<ExitCause>,
}

impl ToastEntry {
    fn new(alert: Alert) -> Self {
        Self {
            id: ToastId::for_alert(&alert.id),
            alert,
            state: PresentationState::Pending,
            gesture: None,
            timer: None,
            visible_since: None,
            exit_cause: None,
        }
    }

    pub fn alert_id(&self) -> &AlertId {
        &self.alert.id
    }

    pub fn item_id(&self) -> &str {
        &self.alert.item_id
    }

    pub fn drag_offset(&self) -> f64 {
        self.gesture.map(|g| g.offset()).unwrap_or(0.0)
    }

    pub fn scale(&self) -> f64 {
        self.gesture.map(|g| g.scale()).unwrap_or(1.0)
    }

    pub fn is_faded(&self) -> bool {
        self.gesture.map(|g| g.is_faded()).unwrap_or(false)
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.map(|g| g.is_dragging()).unwrap_or(false)
    }

    pub fn visible_since(&self) -> Option<Instant> {
        self.visible_since
    }

    /// 已经插入到屏幕上（包括退出动画中）
    pub fn is_on_screen(&self) -> bool {
        matches!(
            self.state,
            PresentationState::Entering | PresentationState::Visible | PresentationState::Exiting
        )
    }
}

/// 队列内部定时事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastTimer {
    Insert(ToastId),
    Settle(ToastId),
    AutoDismiss(ToastId),
    ExitComplete(ToastId),
}

/// 进入退出动画的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitCause {
    /// 自动消失定时器到期
    Timeout,
    /// 用户关闭或查看
    Closed,
    /// 下拉关闭
    Dragged,
}

impl ExitCause {
    /// 是否由用户操作引起
    pub fn is_user_action(&self) -> bool {
        !matches!(self, ExitCause::Timeout)
    }
}

/// toast 被移除后的确认信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastRemoved {
    pub toast_id: ToastId,
    pub alert_id: AlertId,
    pub item_id: String,
    pub cause: ExitCause,
}

/// 定时事件引起的可见变化
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastChange {
    Shown(ToastId),
    Removed(ToastRemoved),
}

/// Toast 队列
pub struct ToastQueue {
    timing: ToastTiming,
    entries: Vec<ToastEntry>,
    timers: Scheduler<ToastTimer>,
}

impl ToastQueue {
    pub fn new(timing: ToastTiming) -> Self {
        Self {
            timing,
            entries: Vec::new(),
            timers: Scheduler::new(),
        }
    }

    pub fn timing(&self) -> ToastTiming {
        self.timing
    }

    /// 追加一批提醒
    pub fn enqueue(&mut self, alerts: &[Alert]) -> usize {
        self.enqueue_at(alerts, Instant::now())
    }

    /// 追加一批提醒（带时间戳，用于测试）
    ///
    /// 只接受 `show_as_toast` 的提醒；已在队列中的提醒被忽略。
    /// 第 i 条在 `i × stagger` 之后插入。
    pub fn enqueue_at(&mut self, alerts: &[Alert], now: Instant) -> usize {
        let mut accepted = 0u32;
        for alert in alerts.iter().filter(|a| a.show_as_toast) {
            let id = ToastId::for_alert(&alert.id);
            if self.contains(&id) {
                debug!(toast_id = %id, "Toast already queued, skipping");
                continue;
            }

            let mut entry = ToastEntry::new(alert.clone());
            let delay = self.timing.stagger * accepted;
            entry.timer = Some(
                self.timers
                    .schedule_at(now, delay, ToastTimer::Insert(id.clone())),
            );
            self.entries.push(entry);
            accepted += 1;
        }
        accepted as usize
    }

    /// 处理到期的定时事件
    pub fn handle_timer(&mut self, timer: ToastTimer, now: Instant) -> Option<ToastChange> {
        match timer {
            ToastTimer::Insert(id) => {
                let settle = self.timing.settle;
                let handle = self.timers.schedule_at(now, settle, ToastTimer::Settle(id.clone()));
                match self.transition(&id, PresentationState::Pending, PresentationState::Entering) {
                    Some(entry) => {
                        entry.timer = Some(handle);
                        debug!(toast_id = %id, "Toast inserted");
                    }
                    None => {
                        self.timers.cancel(handle);
                    }
                }
                None
            }
            ToastTimer::Settle(id) => {
                let auto_dismiss = self.timing.auto_dismiss;
                let handle =
                    self.timers
                        .schedule_at(now, auto_dismiss, ToastTimer::AutoDismiss(id.clone()));
                match self.transition(&id, PresentationState::Entering, PresentationState::Visible) {
                    Some(entry) => {
                        entry.timer = Some(handle);
                        entry.visible_since = Some(now);
                        Some(ToastChange::Shown(id))
                    }
                    None => {
                        self.timers.cancel(handle);
                        None
                    }
                }
            }
            ToastTimer::AutoDismiss(id) => {
                if self.state_of(&id) == Some(PresentationState::Visible) {
                    debug!(toast_id = %id, "Toast auto-dismissed");
                    self.begin_exit(&id, now, ExitCause::Timeout);
                }
                None
            }
            ToastTimer::ExitComplete(id) => {
                if self.state_of(&id) != Some(PresentationState::Exiting) {
                    return None;
                }
                let pos = self.entries.iter().position(|e| e.id == id)?;
                let mut entry = self.entries.remove(pos);
                entry.state = PresentationState::Removed;
                debug!(toast_id = %id, "Toast removed");
                Some(ToastChange::Removed(ToastRemoved {
                    toast_id: entry.id,
                    alert_id: entry.alert.id,
                    item_id: entry.alert.item_id,
                    cause: entry.exit_cause.unwrap_or(ExitCause::Closed),
                }))
            }
        }
    }

    /// 处理 `now` 之前到期的所有定时事件
    pub fn advance(&mut self, now: Instant) -> Vec<ToastChange> {
        self.timers
            .pop_due(now)
            .into_iter()
            .filter_map(|timer| self.handle_timer(timer, now))
            .collect()
    }

    /// 等待下一个定时事件
    pub async fn next_timer(&mut self) -> ToastTimer {
        self.timers.next().await
    }

    /// 手动关闭
    pub fn close(&mut self, id: &ToastId) -> bool {
        self.close_at(id, Instant::now())
    }

    pub fn close_at(&mut self, id: &ToastId, now: Instant) -> bool {
        match self.state_of(id) {
            Some(PresentationState::Entering) | Some(PresentationState::Visible) => {
                self.begin_exit(id, now, ExitCause::Closed);
                true
            }
            _ => false,
        }
    }

    /// 提醒被清除：未插入的 toast 直接丢弃，已展示的进入退出动画
    pub fn dismiss(&mut self, id: &ToastId) -> bool {
        self.dismiss_at(id, Instant::now())
    }

    pub fn dismiss_at(&mut self, id: &ToastId, now: Instant) -> bool {
        if self.state_of(id) != Some(PresentationState::Pending) {
            return self.close_at(id, now);
        }
        let Some(pos) = self.entries.iter().position(|e| &e.id == id) else {
            return false;
        };
        let entry = self.entries.remove(pos);
        if let Some(handle) = entry.timer {
            self.timers.cancel(handle);
        }
        debug!(toast_id = %id, "Pending toast discarded");
        true
    }

    /// 关闭所有已展示的 toast，返回关闭数量
    pub fn close_all_at(&mut self, now: Instant) -> usize {
        let ids: Vec<ToastId> = self
            .entries
            .iter()
            .filter(|e| {
                matches!(
                    e.state,
                    PresentationState::Entering | PresentationState::Visible
                )
            })
            .map(|e| e.id.clone())
            .collect();
        for id in &ids {
            self.begin_exit(id, now, ExitCause::Closed);
        }
        ids.len()
    }

    /// 开始拖拽（仅触摸展示）
    pub fn touch_start(&mut self, id: &ToastId, y: f64) -> bool {
        if !self.timing.touch {
            return false;
        }
        match self.visible_entry_mut(id) {
            Some(entry) => {
                entry.gesture = Some(DragGesture::start(y));
                true
            }
            None => false,
        }
    }

    pub fn touch_move(&mut self, id: &ToastId, y: f64) {
        if let Some(gesture) = self.visible_entry_mut(id).and_then(|e| e.gesture.as_mut()) {
            gesture.move_to(y);
        }
    }

    /// 结束拖拽，超过阈值则进入退出动画
    pub fn touch_end(&mut self, id: &ToastId) -> Option<DragOutcome> {
        self.touch_end_at(id, Instant::now())
    }

    pub fn touch_end_at(&mut self, id: &ToastId, now: Instant) -> Option<DragOutcome> {
        let threshold = self.timing.drag_threshold;
        let outcome = self
            .visible_entry_mut(id)
            .and_then(|e| e.gesture.as_mut())
            .filter(|g| g.is_dragging())
            .map(|g| g.end(threshold))?;

        if outcome == DragOutcome::Dismiss {
            debug!(toast_id = %id, "Toast dismissed by drag");
            self.begin_exit(id, now, ExitCause::Dragged);
        }
        Some(outcome)
    }

    /// 物品被删除时直接移除相关 toast（不触发确认回调）
    pub fn remove_for_item(&mut self, item_id: &str) -> usize {
        let mut removed = 0;
        let timers = &mut self.timers;
        self.entries.retain(|entry| {
            if entry.alert.item_id != item_id {
                return true;
            }
            if let Some(handle) = entry.timer {
                timers.cancel(handle);
            }
            removed += 1;
            false
        });
        removed
    }

    /// 清空队列并取消所有定时器
    pub fn clear(&mut self) {
        self.timers.cancel_all();
        self.entries.clear();
    }

    pub fn entries(&self) -> &[ToastEntry] {
        &self.entries
    }

    pub fn get(&self, id: &ToastId) -> Option<&ToastEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn state_of(&self, id: &ToastId) -> Option<PresentationState> {
        self.get(id).map(|e| e.state)
    }

    pub fn contains(&self, id: &ToastId) -> bool {
        self.get(id).is_some()
    }

    /// 屏幕上的 toast，按插入顺序
    pub fn on_screen(&self) -> impl Iterator<Item = &ToastEntry> {
        self.entries.iter().filter(|e| e.is_on_screen())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    fn entry_mut(&mut self, id: &ToastId) -> Option<&mut ToastEntry> {
        self.entries.iter_mut().find(|e| &e.id == id)
    }

    fn visible_entry_mut(&mut self, id: &ToastId) -> Option<&mut ToastEntry> {
        self.entry_mut(id)
            .filter(|e| e.state == PresentationState::Visible)
    }

    fn transition(
        &mut self,
        id: &ToastId,
        from: PresentationState,
        to: PresentationState,
    ) -> Option<&mut ToastEntry> {
        let entry = self.entry_mut(id)?;
        if entry.state != from {
            debug!(toast_id = %id, state = ?entry.state, "Stale toast timer ignored");
            return None;
        }
        entry.state = to;
        Some(entry)
    }

    fn begin_exit(&mut self, id: &ToastId, now: Instant, cause: ExitCause) {
        let exit = self.timing.exit;
        let handle = self
            .timers
            .schedule_at(now, exit, ToastTimer::ExitComplete(id.clone()));
        let previous = match self.entry_mut(id) {
            Some(entry) => {
                entry.state = PresentationState::Exiting;
                entry.exit_cause = Some(cause);
                entry.gesture = None;
                entry.timer.replace(handle)
            }
            None => {
                self.timers.cancel(handle);
                return;
            }
        };
        if let Some(previous) = previous {
            self.timers.cancel(previous);
        }
    }
}
