//! 拟合运行统计.

use std::time::{Duration, Instant};

/// ablation/benchmark 计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时 (`self.start()`).
    #[inline]
    pub fn new() -> Self {
        Self {
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    pub fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// # 注意
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    pub fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 获得总共累计下来的时间综合 (以微秒为单位).
    #[inline]
    pub fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

impl Default for AccTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// 一组拟合配置的统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 每次拟合的体素个数.
    voxels: u64,

    /// 重复拟合次数.
    runs: u64,

    /// 拟合本身花费的总时间.
    fit_time: AccTimer,

    /// 整个任务花费的总时间 (包括结果比较).
    real_time: AccTimer,

    /// 最耗时的一次拟合.
    most: Option<Duration>,

    /// 与参考配置相比, FA 的最大绝对偏差.
    fa_dev: f64,

    /// 与参考配置相比, 特征值的最大绝对偏差.
    eval_dev: f64,
}

impl Profile {
    /// 初始化. `voxels` 是每次拟合参与的体素个数.
    #[inline]
    pub fn new(voxels: usize) -> Self {
        Self {
            voxels: voxels as u64,
            runs: 0,
            fit_time: AccTimer::default(),
            real_time: AccTimer::default(),
            most: None,
            fa_dev: 0.0,
            eval_dev: 0.0,
        }
    }

    /// 开始一次拟合计时.
    #[inline]
    pub fn fit_start(&mut self) {
        self.fit_time.start();
    }

    /// 结束一次拟合计时.
    #[inline]
    pub fn fit_elapsed(&mut self) {
        let d = self.fit_time.elapsed();
        self.runs += 1;
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
    }

    /// 记录一次与参考结果的偏差.
    #[inline]
    pub fn record_deviation(&mut self, fa: f64, evals: f64) {
        self.fa_dev = self.fa_dev.max(fa);
        self.eval_dev = self.eval_dev.max(evals);
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 每次拟合的体素个数.
    #[inline]
    pub fn get_voxels(&self) -> u64 {
        self.voxels
    }

    /// 拟合次数.
    #[inline]
    pub fn get_runs(&self) -> u64 {
        self.runs
    }

    /// 以微秒为单位获得拟合总时间.
    #[inline]
    pub fn get_fit_time_us(&self) -> u64 {
        self.fit_time.get_total_us()
    }

    /// 以微秒为单位获得任务总时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 以微秒为单位获得单次拟合的平均时间.
    #[inline]
    pub fn get_avg_fit_time_us(&self) -> Option<f64> {
        match self.runs {
            0 => None,
            runs => Some(self.get_fit_time_us() as f64 / runs as f64),
        }
    }

    /// 以纳秒为单位获得单个体素的平均拟合时间.
    #[inline]
    pub fn get_avg_voxel_time_ns(&self) -> Option<f64> {
        match self.runs * self.voxels {
            0 => None,
            n => Some(self.get_fit_time_us() as f64 * 1e3 / n as f64),
        }
    }

    /// 最耗时的一次拟合.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<Duration> {
        self.most
    }

    /// FA 的最大绝对偏差.
    #[inline]
    pub fn get_fa_deviation(&self) -> f64 {
        self.fa_dev
    }

    /// 特征值的最大绝对偏差.
    #[inline]
    pub fn get_eval_deviation(&self) -> f64 {
        self.eval_dev
    }
}
