//! 设计矩阵 (B 矩阵).
//!
//! 对数线性化的张量模型为 `ln S = ln S0 - b g^T D g`. 将 `D` 的六个独立分量与截距
//! 排成列向量后, 每次采集对应设计矩阵的一行:
//!
//! `[-b gx gx, -b gy gy, -b gz gz, -2b gx gy, -2b gx gz, -2b gy gz, 1]`.

use itertools::izip;
use log::warn;
use ndarray::{Array1, Array2, ArrayView1};

use crate::acquisition::Acquisition;
use crate::consts::DESIGN_COLS;
use crate::{Diagnostic, FitError, FitResult};

/// 设计矩阵及构建时产生的诊断信息.
pub type DesignOutput<T> = (Array2<T>, Option<Diagnostic>);

/// 获取与 b 值逐一对应的 `3 x g` 梯度表.
///
/// 若列数与 b 值个数不一致, 则按非零 b 值的顺序把给定梯度依次填入, 其余 (b0)
/// 列补零. 这只是尽力而为的恢复, 因此会同时返回诊断信息.
fn aligned_gradients(acq: &Acquisition) -> FitResult<(Array2<f64>, Option<Diagnostic>)> {
    let bvals = acq.bvals();
    let given = acq.gradients().view();
    let (columns, g) = (given.ncols(), bvals.len());
    if g == 0 {
        return Err(FitError::EmptyAcquisition);
    }
    if columns == g {
        return Ok((given.to_owned(), None));
    }

    let nonzero_bvals = acq.weighted_len();
    if nonzero_bvals != columns {
        return Err(FitError::GradientRecovery {
            nonzero_bvals,
            columns,
        });
    }
    warn!(
        "gradient table has {columns} columns but there are {g} b-values; \
         assuming b0 columns were stripped and padding them with zeros"
    );

    let mut padded = Array2::<f64>::zeros((3, g));
    for (dst, src) in bvals
        .iter()
        .enumerate()
        .filter(|(_, b)| **b > 0.0)
        .map(|(i, _)| i)
        .zip(given.columns())
    {
        padded.column_mut(dst).assign(&src);
    }
    let diag = Diagnostic::GradientBValueMismatch {
        columns,
        bvals: g,
    };
    Ok((padded, Some(diag)))
}

macro_rules! impl_design_matrix {
    ($name: ident, $fp: ty) => {
        /// 构建 `g x 7` 设计矩阵.
        ///
        /// 前六列依次为 `Bxx, Byy, Bzz, Bxy, Bxz, Byz` (交叉项乘 2, 整体取负),
        /// 第七列恒为 1. 若梯度表与 b 值个数不一致, 见 [`Diagnostic::GradientBValueMismatch`].
        pub fn $name(acq: &Acquisition) -> FitResult<DesignOutput<$fp>> {
            let (grad, diag) = aligned_gradients(acq)?;
            let bvals = acq.bvals();
            let mut b = Array2::<$fp>::zeros((bvals.len(), DESIGN_COLS));

            for (mut row, &bv, &x, &y, &z) in izip!(
                b.rows_mut(),
                bvals.iter(),
                grad.row(0).iter(),
                grad.row(1).iter(),
                grad.row(2).iter()
            ) {
                row.assign(&ArrayView1::from(&[
                    -(x * x * bv) as $fp,
                    -(y * y * bv) as $fp,
                    -(z * z * bv) as $fp,
                    -(x * y * 2.0 * bv) as $fp,
                    -(x * z * 2.0 * bv) as $fp,
                    -(y * z * 2.0 * bv) as $fp,
                    1.0,
                ]));
            }
            Ok((b, diag))
        }
    };
}

impl_design_matrix!(design_matrix_f32, f32);
impl_design_matrix!(design_matrix_f64, f64);

/// 构建 `f64` 精度的设计矩阵. 等价于 [`design_matrix_f64`].
#[inline]
pub fn design_matrix(acq: &Acquisition) -> FitResult<DesignOutput<f64>> {
    design_matrix_f64(acq)
}

/// 由张量分量 (及截距) 预测某次采集的对数信号, 即 `B · params`.
///
/// `params` 长度必须为 7, 否则程序 panic.
pub fn predict_log_signal(design: &Array2<f64>, params: ArrayView1<f64>) -> Array1<f64> {
    assert_eq!(params.len(), DESIGN_COLS);
    design.dot(&params)
}
