//! 拟合进度通知与取消.
//!
//! 进度上报与数值计算完全分离: 拟合核心只在每个批次结束后产生一个
//! [`ProgressEvent`], 由外部注入的 [`ProgressObserver`] 决定如何处理.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::info;

/// 一次进度通知.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    /// 已完成的体素个数.
    pub completed: usize,

    /// 体素总数.
    pub total: usize,

    /// 已完成比例, `[0, 1]`.
    pub fraction: f64,

    /// 预计剩余时间. 尚无完成体素时为 `None`.
    pub eta: Option<Duration>,
}

/// 进度观察者. 开启 `rayon` 时会在多个工作线程中被并发调用.
pub trait ProgressObserver: Send + Sync {
    /// 接收一次进度通知.
    fn on_progress(&self, event: &ProgressEvent);
}

/// 丢弃所有通知.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    #[inline]
    fn on_progress(&self, _: &ProgressEvent) {}
}

/// 通过 `log` 门面以 `info` 级别输出进度.
///
/// 为避免刷屏, 只在完成比例跨过新的 `step` 整数倍时输出.
#[derive(Debug)]
pub struct LogProgress {
    step: f64,
    last_bucket: AtomicUsize,
}

impl LogProgress {
    /// 每完成 `step` (例如 0.1 即 10%) 输出一次. `step` 必须在 `(0, 1]` 内, 否则 panic.
    pub fn new(step: f64) -> Self {
        assert!(step > 0.0 && step <= 1.0, "进度输出间隔必须在 (0, 1] 内");
        Self {
            step,
            last_bucket: AtomicUsize::new(0),
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl ProgressObserver for LogProgress {
    fn on_progress(&self, e: &ProgressEvent) {
        let bucket = (e.fraction / self.step).floor() as usize;
        if self.last_bucket.fetch_max(bucket, Ordering::AcqRel) >= bucket {
            return;
        }
        match e.eta {
            Some(eta) => info!(
                "{:.0}% ... {}/{} voxels, time left: {} min {} sec",
                e.fraction * 100.0,
                e.completed,
                e.total,
                eta.as_secs() / 60,
                eta.as_secs() % 60
            ),
            None => info!("{:.0}% ... {}/{} voxels", e.fraction * 100.0, e.completed, e.total),
        }
    }
}

/// 取消令牌. 克隆得到的令牌共享同一状态.
///
/// 拟合在批次之间检查该令牌, 已完成的批次不受影响.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// 新建未取消的令牌.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// 是否已请求取消.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 拟合时的外部控制: 进度观察者与取消令牌.
#[derive(Clone)]
pub struct FitControl {
    observer: Arc<dyn ProgressObserver>,
    cancel: CancelToken,
}

impl Default for FitControl {
    fn default() -> Self {
        Self::silent()
    }
}

impl FitControl {
    /// 不输出进度, 不可取消.
    pub fn silent() -> Self {
        Self {
            observer: Arc::new(NoProgress),
            cancel: CancelToken::new(),
        }
    }

    /// 通过 `log` 每 10% 输出一次进度.
    pub fn verbose() -> Self {
        Self {
            observer: Arc::new(LogProgress::default()),
            cancel: CancelToken::new(),
        }
    }

    /// 替换进度观察者.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// 替换取消令牌.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 取消令牌.
    #[inline]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    #[inline]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[inline]
    pub(crate) fn observer(&self) -> &dyn ProgressObserver {
        self.observer.as_ref()
    }
}

/// 多线程共享的进度计数器.
pub(crate) struct ProgressCounter {
    done: AtomicUsize,
    total: usize,
    since: Instant,
}

impl ProgressCounter {
    pub fn new(total: usize) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
            since: Instant::now(),
        }
    }

    /// 已完成的体素个数.
    #[inline]
    pub fn completed(&self) -> usize {
        self.done.load(Ordering::Acquire)
    }

    /// 记录新完成的 `n` 个体素, 返回对应的进度通知.
    pub fn advance(&self, n: usize) -> ProgressEvent {
        let completed = self.done.fetch_add(n, Ordering::AcqRel) + n;
        let fraction = if self.total == 0 {
            1.0
        } else {
            completed as f64 / self.total as f64
        };
        let eta = (completed > 0).then(|| {
            let per_voxel = self.since.elapsed().as_secs_f64() / completed as f64;
            Duration::from_secs_f64(per_voxel * self.total.saturating_sub(completed) as f64)
        });
        ProgressEvent {
            completed,
            total: self.total,
            fraction,
            eta,
        }
    }
}
