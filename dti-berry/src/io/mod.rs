//! 读写: NIfTI 格式的 DWI 与结果图, FSL 格式的 bval/bvec 文本, npz 归档.

use ndarray::ShapeError;
use ndarray_npy::WriteNpzError;
use nifti::NiftiError;
use thiserror::Error;

use crate::FitError;

mod fsl;
mod npz;
mod volume;

pub use fsl::{parse_bvals, parse_bvecs, read_acquisition, read_fsl_bvals, read_fsl_bvecs};
pub use npz::save_npz;
pub use volume::{read_mask, save_scalar_maps, DwiScan, SCALAR_MAP_NAMES, TENSOR_MAP_NAME};

/// 读写错误.
#[derive(Debug, Error)]
pub enum IoError {
    /// 底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// NIfTI 读写错误.
    #[error(transparent)]
    Nifti(#[from] NiftiError),

    /// 体数据维度不符合预期 (例如 DWI 不是 4D).
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// 写 npz 归档错误.
    #[error(transparent)]
    Npz(#[from] WriteNpzError),

    /// 文本表格中存在无法解析为数值的内容.
    #[error("line {line}: cannot parse {token:?} as a number")]
    Parse {
        /// 行号, 从 1 开始.
        line: usize,

        /// 无法解析的内容.
        token: String,
    },

    /// 文本表格各行长度不一致.
    #[error("line {line}: expected {expected} values, found {found}")]
    Ragged {
        /// 行号, 从 1 开始.
        line: usize,

        /// 首行的长度.
        expected: usize,

        /// 该行的长度.
        found: usize,
    },

    /// b 值为负数或非有限值.
    #[error("invalid b-value {value} at position {index}")]
    InvalidBValue {
        /// 在 b 值序列中的下标.
        index: usize,

        /// 原始值.
        value: f64,
    },

    /// 梯度表或采集参数不合法.
    #[error(transparent)]
    Fit(#[from] FitError),
}
