//! 运行时错误与诊断信息.

use ndarray_linalg::error::LinalgError;
use thiserror::Error;

/// 拟合的运行时错误.
#[derive(Debug, Error)]
pub enum FitError {
    /// mask 与信号体数据的空间形状不一致. 此时不会进行任何体素计算.
    #[error("mask shape {mask:?} does not match signal volume shape {signal:?}")]
    ShapeMismatch {
        /// mask 形状.
        mask: (usize, usize, usize),

        /// 信号体数据前三维形状.
        signal: (usize, usize, usize),
    },

    /// 某体素的张量特征分解没有得到恰好三个特征值. 整个拟合随之中止.
    #[error("voxel #{voxel}: expected 3 eigenvalues, found {found}")]
    Decomposition {
        /// 紧凑体素列表中的下标.
        voxel: usize,

        /// 实际得到的特征值个数.
        found: usize,
    },

    /// 梯度表列数与 b 值个数不一致, 且无法按非零 b 值补零恢复.
    #[error("cannot rebuild gradient table: {columns} gradient columns for {nonzero_bvals} non-zero b-values")]
    GradientRecovery {
        /// 非零 b 值的个数.
        nonzero_bvals: usize,

        /// 给定梯度表的列数.
        columns: usize,
    },

    /// 梯度表不是 `3 x g` 或 `g x 3`.
    #[error("gradient table must be 3 x g or g x 3, got {0:?}")]
    GradientShape((usize, usize)),

    /// 没有任何梯度方向.
    #[error("empty acquisition: no b-values")]
    EmptyAcquisition,

    /// 信号通道数与 b 值个数不一致.
    #[error("signal has {found} channels but {expected} b-values were given")]
    SignalLength {
        /// b 值个数.
        expected: usize,

        /// 信号通道数.
        found: usize,
    },

    /// SVD 没有返回奇异向量.
    #[error("singular vectors were not computed")]
    SingularVectors,

    /// 底层 LAPACK 错误.
    #[error(transparent)]
    Linalg(#[from] LinalgError),

    /// 拟合被取消. 已完成的批次不受影响.
    #[error("fit cancelled after {completed} of {total} voxels")]
    Cancelled {
        /// 已完成的体素个数.
        completed: usize,

        /// 体素总数.
        total: usize,
    },
}

impl FitError {
    /// 将特征分解错误定位到紧凑体素列表中的第 `voxel` 个体素. 其余错误原样返回.
    pub(crate) fn at_voxel(self, voxel: usize) -> Self {
        match self {
            Self::Decomposition { found, .. } => Self::Decomposition { voxel, found },
            e => e,
        }
    }
}

/// 拟合运行时错误.
pub type FitResult<T> = Result<T, FitError>;

/// 拟合过程中产生的非致命诊断信息.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// 梯度表列数与 b 值个数不一致 (常见于 b0 已从梯度表中剔除).
    /// 已按非零 b 值的位置补零重建梯度表.
    GradientBValueMismatch {
        /// 给定梯度表的列数.
        columns: usize,

        /// b 值个数.
        bvals: usize,
    },
}
