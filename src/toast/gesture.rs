//! 触摸拖拽手势 - 向下拖动超过阈值即关闭

/// 拖拽结束后的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// 超过阈值，进入退出动画
    Dismiss,
    /// 未超过阈值，偏移复位
    Reset,
}

/// 单次拖拽的状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragGesture {
    start_y: f64,
    offset: f64,
    dragging: bool,
}

impl DragGesture {
    /// 缩放下限
    const MIN_SCALE: f64 = 0.95;
    /// 偏移到缩放的换算分母
    const SCALE_DIVISOR: f64 = 500.0;
    /// 超过该偏移后内容变淡
    const FADE_OFFSET: f64 = 30.0;

    pub fn start(y: f64) -> Self {
        Self {
            start_y: y,
            offset: 0.0,
            dragging: true,
        }
    }

    /// 只累计向下的移动
    pub fn move_to(&mut self, y: f64) {
        if !self.dragging {
            return;
        }
        let diff = y - self.start_y;
        if diff > 0.0 {
            self.offset = diff;
        }
    }

    /// 结束拖拽
    pub fn end(&mut self, threshold: f64) -> DragOutcome {
        self.dragging = false;
        if self.offset > threshold {
            DragOutcome::Dismiss
        } else {
            self.offset = 0.0;
            DragOutcome::Reset
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// 拖拽中按偏移缩小
    pub fn scale(&self) -> f64 {
        if self.dragging {
            (1.0 - self.offset / Self::SCALE_DIVISOR).max(Self::MIN_SCALE)
        } else {
            1.0
        }
    }

    pub fn is_faded(&self) -> bool {
        self.dragging && self.offset > Self::FADE_OFFSET
    }
}
