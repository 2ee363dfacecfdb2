//! 两步估计: 全体 OLS 求权重, 逐体素 WLS 求解.

use cfg_if::cfg_if;
use itertools::izip;
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::acquisition::Acquisition;
use crate::consts::{DEFAULT_B0_THRESHOLD, DEFAULT_BATCH_SIZE, EIGEN_PACK_LEN, TENSOR_COMPONENTS};
use crate::design::design_matrix;
use crate::progress::{FitControl, ProgressCounter};
use crate::{Diagnostic, FitError, FitResult};

pub mod ols;
pub mod wls;

pub use ols::LogSignal;

cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 拟合参数.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FitOptions {
    /// 自动生成 mask 时 b0 信号的阈值.
    pub threshold: f64,

    /// 是否通过 `log` 输出进度.
    pub verbose: bool,

    /// 对数信号是否以 `i16` 定点形式存储.
    pub quantize: bool,

    /// 每个批次的体素个数. 必须为正.
    pub batch_size: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_B0_THRESHOLD,
            verbose: false,
            quantize: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl FitOptions {
    /// 设置 mask 阈值.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// 设置是否输出进度.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// 设置是否使用定点对数信号.
    pub fn with_quantize(mut self, quantize: bool) -> Self {
        self.quantize = quantize;
        self
    }

    /// 设置批次大小. `batch_size == 0` 时 panic.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        assert!(batch_size > 0, "批次大小必须为正");
        self.batch_size = batch_size;
        self
    }

    /// 按 `verbose` 生成默认的拟合控制.
    pub fn control(&self) -> FitControl {
        if self.verbose {
            FitControl::verbose()
        } else {
            FitControl::silent()
        }
    }
}

/// 紧凑体素列表上的拟合结果.
#[derive(Clone, Debug)]
pub struct WlsFit {
    eigen: Array2<f64>,
    tensor: Array2<f64>,
    log_s0: Array1<f64>,
    design: Array2<f64>,
    diagnostics: Vec<Diagnostic>,
}

impl WlsFit {
    /// `V x 12`, 每行为 `[λ1, λ2, λ3, e1, e2, e3]`, 特征值降序, 特征向量按分量展开.
    #[inline]
    pub fn eigen(&self) -> ArrayView2<'_, f64> {
        self.eigen.view()
    }

    /// `V x 6`, 每行为 `[Dxx, Dyy, Dzz, Dxy, Dxz, Dyz]`.
    #[inline]
    pub fn tensor(&self) -> ArrayView2<'_, f64> {
        self.tensor.view()
    }

    /// 每个体素的 `ln(S0)`.
    #[inline]
    pub fn log_s0(&self) -> ArrayView1<'_, f64> {
        self.log_s0.view()
    }

    /// 本次拟合使用的 `g x 7` 设计矩阵.
    #[inline]
    pub fn design(&self) -> &Array2<f64> {
        &self.design
    }

    /// 拟合过程中产生的诊断信息.
    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// 体素个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.eigen.nrows()
    }

    /// 是否没有体素.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.eigen.nrows() == 0
    }

    /// 拆出特征结果, 张量分量与 `ln(S0)`.
    pub fn into_parts(self) -> (Array2<f64>, Array2<f64>, Array1<f64>) {
        (self.eigen, self.tensor, self.log_s0)
    }
}

/// 对 `V x g` 的紧凑信号做两步估计.
///
/// 体素之间互不依赖, 结果与批次大小和线程数无关.
/// 每个批次开始前检查取消令牌, 每个批次结束后上报一次进度.
///
/// `opts.quantize` 只影响 OLS 权重的存储精度, WLS 右端项始终是全精度的 `ln(S)`.
///
/// # 注意
///
/// 任一体素特征分解失败时, 整次拟合以该体素的下标返回 [`FitError::Decomposition`].
pub fn fit_voxels(
    signal: ArrayView2<f32>,
    acq: &Acquisition,
    opts: &FitOptions,
    ctl: &FitControl,
) -> FitResult<WlsFit> {
    assert!(opts.batch_size > 0, "批次大小必须为正");
    if acq.is_empty() {
        return Err(FitError::EmptyAcquisition);
    }
    let (total, g) = signal.dim();
    if g != acq.len() {
        return Err(FitError::SignalLength {
            expected: acq.len(),
            found: g,
        });
    }

    let (design, diagnostic) = design_matrix(acq)?;
    let log_s = LogSignal::from_signal(signal, opts.quantize);
    let log_ols = ols::ols_estimate(&log_s, &design)?;
    debug!(
        "OLS done: {total} voxels, {g} gradients, fixed point: {}",
        log_s.is_fixed()
    );

    let mut eigen = Array2::<f64>::zeros((total, EIGEN_PACK_LEN));
    let mut tensor = Array2::<f64>::zeros((total, TENSOR_COMPONENTS));
    let mut log_s0 = Array1::<f64>::zeros(total);
    let counter = ProgressCounter::new(total);
    let batch = opts.batch_size;

    type Batch<'a> = (ArrayViewMut2<'a, f64>, ArrayViewMut2<'a, f64>, ArrayViewMut1<'a, f64>);
    let job = |(k, (mut eig, mut ten, mut s0)): (usize, Batch<'_>)| -> FitResult<()> {
        if ctl.is_cancelled() {
            return Err(FitError::Cancelled {
                completed: counter.completed(),
                total,
            });
        }
        let start = k * batch;
        let rows = izip!(eig.outer_iter_mut(), ten.outer_iter_mut(), s0.iter_mut());
        for (j, (mut row, mut d, s0)) in rows.enumerate() {
            let i = start + j;
            let ln_s = ols::log_row(signal.row(i));
            let (e, t, ln_s0) = wls::fit_voxel(&design, log_ols.row(i).view(), ln_s.view())
                .map_err(|e| e.at_voxel(i))?;
            row.assign(&ArrayView1::from(&e.pack(1.0)));
            d.assign(&ArrayView1::from(&t.components()));
            *s0 = ln_s0;
        }
        ctl.observer().on_progress(&counter.advance(eig.nrows()));
        Ok(())
    };

    let chunks: Vec<Batch<'_>> = izip!(
        eigen.axis_chunks_iter_mut(Axis(0), batch),
        tensor.axis_chunks_iter_mut(Axis(0), batch),
        log_s0.axis_chunks_iter_mut(Axis(0), batch)
    )
    .collect();
    cfg_if! {
        if #[cfg(feature = "rayon")] {
            chunks.into_par_iter().enumerate().try_for_each(job)?;
        } else {
            chunks.into_iter().enumerate().try_for_each(job)?;
        }
    }
    debug!("WLS done: {} voxels", counter.completed());

    Ok(WlsFit {
        eigen,
        tensor,
        log_s0,
        design,
        diagnostics: diagnostic.into_iter().collect(),
    })
}
