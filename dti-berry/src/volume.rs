//! 整个体数据的张量拟合.

use log::{debug, info};
use ndarray::{s, Array1, Array2, Array3, Array4, ArrayView3, ArrayView4, Axis};

use crate::acquisition::Acquisition;
use crate::fit::{fit_voxels, FitOptions};
use crate::progress::FitControl;
use crate::tensor::{metrics, EigenResult};
use crate::{Diagnostic, FitError, FitResult, Idx3d, Mask, VoxelIndex};

/// 一次体数据拟合的全部结果.
///
/// 所有结果体数据与输入信号的前三维同形状, 未参与拟合的体素处处为 0.
/// 计算以 `f64` 进行, 结果以 `f32` 保存.
#[derive(Clone, Debug)]
pub struct TensorVolume {
    eigen: Array4<f32>,
    tensor: Array4<f32>,
    adc: Array3<f32>,
    fa: Array3<f32>,
    s0: Array3<f32>,
    mask: Mask,
    design: Array2<f64>,
    diagnostics: Vec<Diagnostic>,
}

impl TensorVolume {
    /// 拟合 `(X, Y, Z, g)` 的 DWI 信号.
    ///
    /// `mask` 为 `None` 时, 由第一个通道以 `opts.threshold` 阈值自动生成.
    /// 进度输出由 `opts.verbose` 决定, 不可取消. 需要自定义进度或取消时使用 [`Self::fit_with`].
    pub fn fit(
        signal: ArrayView4<f32>,
        acq: &Acquisition,
        mask: Option<&Mask>,
        opts: &FitOptions,
    ) -> FitResult<Self> {
        Self::fit_with(signal, acq, mask, opts, &opts.control())
    }

    /// 同 [`Self::fit`], 进度观察者与取消令牌由 `ctl` 提供.
    ///
    /// # 注意
    ///
    /// 1. 显式给出的 mask 与信号形状不一致时, 在任何体素计算之前返回 [`FitError::ShapeMismatch`].
    /// 2. 错误中的体素下标是紧凑列表中的下标, 可用 [`VoxelIndex::coord`] 还原坐标.
    pub fn fit_with(
        signal: ArrayView4<f32>,
        acq: &Acquisition,
        mask: Option<&Mask>,
        opts: &FitOptions,
        ctl: &FitControl,
    ) -> FitResult<Self> {
        let (x, y, z, g) = signal.dim();
        if let Some(m) = mask {
            if m.shape() != (x, y, z) {
                return Err(FitError::ShapeMismatch {
                    mask: m.shape(),
                    signal: (x, y, z),
                });
            }
        }
        if acq.is_empty() {
            return Err(FitError::EmptyAcquisition);
        }
        if g != acq.len() {
            return Err(FitError::SignalLength {
                expected: acq.len(),
                found: g,
            });
        }

        let mask = match mask {
            Some(m) => m.clone(),
            None => Mask::from_signal(signal, opts.threshold),
        };
        let index = VoxelIndex::from_mask(&mask);
        info!(
            "fitting {} of {} voxels, {} gradients",
            index.len(),
            x * y * z,
            g
        );

        let compact = index.gather(signal);
        let fit = fit_voxels(compact.view(), acq, opts, ctl)?;
        let diagnostics = fit.diagnostics().to_vec();
        let design = fit.design().clone();
        let (eigen, tensor, log_s0) = fit.into_parts();

        let evals = |r: ndarray::ArrayView1<f64>| [r[0], r[1], r[2]];
        let adc: Array1<f64> = eigen.outer_iter().map(|r| metrics::adc(&evals(r))).collect();
        let fa: Array1<f64> = eigen.outer_iter().map(|r| metrics::fa(&evals(r))).collect();
        let s0 = log_s0.mapv(f64::exp);
        debug!("scattering results back to {:?}", index.shape());

        Ok(Self {
            eigen: index.scatter(eigen.view()),
            tensor: index.scatter(tensor.view()),
            adc: index.scatter_scalar(adc.view()),
            fa: index.scatter_scalar(fa.view()),
            s0: index.scatter_scalar(s0.view()),
            mask,
            design,
            diagnostics,
        })
    }

    /// 空间形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.mask.shape()
    }

    /// `(X, Y, Z, 12)` 的打包特征结果, 布局见 [`EigenResult::pack`].
    #[inline]
    pub fn eigen(&self) -> ArrayView4<'_, f32> {
        self.eigen.view()
    }

    /// `(X, Y, Z, 6)` 的张量分量 `[Dxx, Dyy, Dzz, Dxy, Dxz, Dyz]`.
    #[inline]
    pub fn tensor(&self) -> ArrayView4<'_, f32> {
        self.tensor.view()
    }

    /// `(X, Y, Z, 3)` 的降序特征值.
    #[inline]
    pub fn evals(&self) -> ArrayView4<'_, f32> {
        self.eigen.slice(s![.., .., .., 0..3])
    }

    /// `(X, Y, Z, 9)` 的特征向量, 依次为 `e1, e2, e3`.
    #[inline]
    pub fn evecs(&self) -> ArrayView4<'_, f32> {
        self.eigen.slice(s![.., .., .., 3..12])
    }

    /// `(X, Y, Z, 3)` 的主方向.
    #[inline]
    pub fn principal_evec(&self) -> ArrayView4<'_, f32> {
        self.eigen.slice(s![.., .., .., 3..6])
    }

    /// 第 `k` 个特征值 (`k = 0` 最大). `k >= 3` 时 panic.
    #[inline]
    pub fn eval(&self, k: usize) -> ArrayView3<'_, f32> {
        assert!(k < 3, "只有 3 个特征值");
        self.eigen.index_axis(Axis(3), k)
    }

    /// 表观扩散系数图.
    #[inline]
    pub fn adc(&self) -> ArrayView3<'_, f32> {
        self.adc.view()
    }

    /// 各向异性分数图.
    #[inline]
    pub fn fa(&self) -> ArrayView3<'_, f32> {
        self.fa.view()
    }

    /// 拟合得到的无扩散加权信号 `S0`.
    #[inline]
    pub fn s0(&self) -> ArrayView3<'_, f32> {
        self.s0.view()
    }

    /// 实际使用的 mask.
    #[inline]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// 本次拟合使用的 `g x 7` 设计矩阵.
    #[inline]
    pub fn design_matrix(&self) -> &Array2<f64> {
        &self.design
    }

    /// 非致命诊断信息.
    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// 坐标 `pos` 处的特征结果. 越界时返回 `None`.
    pub fn eigen_at(&self, pos: Idx3d) -> Option<EigenResult> {
        let (x, y, z) = pos;
        let (sx, sy, sz) = self.shape();
        if x >= sx || y >= sy || z >= sz {
            return None;
        }
        let lane = self.eigen.slice(s![x, y, z, ..]).mapv(f64::from);
        Some(EigenResult::unpack(lane.view()))
    }
}
