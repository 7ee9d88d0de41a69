//! 定时器调度 - 可取消的定时事件集合
//!
//! 每个组件持有自己的 `Scheduler`，到期事件由持有者在事件循环中取出处理。
//! 所有定时器可以通过 `cancel_all` 一次性取消，会话结束后不会留下悬挂的定时器。

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// 周期定时器的最小周期，零周期会在同一时刻无限重排
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// 定时器句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Timer<E> {
    period: Option<Duration>,
    event: E,
}

/// 按截止时间排序的定时事件
#[derive(Debug)]
pub struct Scheduler<E> {
    /// (deadline, id) -> timer，同一时刻按创建顺序触发
    timers: BTreeMap<(Instant, u64), Timer<E>>,
    /// id -> deadline
    index: HashMap<u64, Instant>,
    next_id: u64,
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            timers: BTreeMap::new(),
            index: HashMap::new(),
            next_id: 0,
        }
    }

    /// 在 `now + delay` 触发一次
    pub fn schedule_at(&mut self, now: Instant, delay: Duration, event: E) -> TimerHandle {
        self.insert(now + delay, None, event)
    }

    /// 在 `now + first_delay` 首次触发，之后每隔 `period` 触发
    ///
    /// `period` 小于 `MIN_PERIOD` 时按 `MIN_PERIOD` 处理。
    pub fn schedule_every(
        &mut self,
        now: Instant,
        first_delay: Duration,
        period: Duration,
        event: E,
    ) -> TimerHandle {
        self.insert(now + first_delay, Some(period.max(MIN_PERIOD)), event)
    }

    /// 取消定时器，返回是否仍在等待
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.index.remove(&handle.0) {
            Some(deadline) => self.timers.remove(&(deadline, handle.0)).is_some(),
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
        self.index.clear();
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.index.contains_key(&handle.0)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.keys().next().map(|(deadline, _)| *deadline)
    }

    /// 取出所有已到期的事件（按触发顺序）
    pub fn pop_due(&mut self, now: Instant) -> Vec<E> {
        let mut due = Vec::new();
        while let Some(event) = self.pop_one(now) {
            due.push(event);
        }
        due
    }

    /// 等待下一个事件；没有定时器时永远挂起
    ///
    /// 可以安全地放进 `tokio::select!`：只有在返回时才修改内部状态。
    pub async fn next(&mut self) -> E {
        loop {
            let Some(deadline) = self.next_deadline() else {
                return std::future::pending().await;
            };
            sleep_until(deadline).await;
            if let Some(event) = self.pop_one(Instant::now()) {
                return event;
            }
        }
    }

    fn insert(&mut self, deadline: Instant, period: Option<Duration>, event: E) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.timers.insert((deadline, id), Timer { period, event });
        self.index.insert(id, deadline);
        TimerHandle(id)
    }

    fn pop_one(&mut self, now: Instant) -> Option<E> {
        let (&(deadline, id), _) = self.timers.iter().next()?;
        if deadline > now {
            return None;
        }

        let timer = self.timers.remove(&(deadline, id))?;
        self.index.remove(&id);

        if let Some(period) = timer.period {
            // 错过的周期不补发
            let mut next = deadline + period;
            if next <= now {
                next = now + period;
            }
            self.timers.insert(
                (next, id),
                Timer {
                    period: Some(period),
                    event: timer.event.clone(),
                },
            );
            self.index.insert(id, next);
        }

        Some(timer.event)
    }
}

impl<E: Clone> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}
