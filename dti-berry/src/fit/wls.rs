//! 单个体素的加权最小二乘.

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::consts::{component::LOG_S0, DESIGN_COLS};
use crate::linalg::pinv;
use crate::tensor::{decompose, DiffusionTensor, EigenResult};
use crate::FitResult;

/// 求解一个体素的 7 个参数 `[Dxx, Dyy, Dzz, Dxy, Dxz, Dyz, ln(S0)]`.
///
/// 权重 `w = exp(log_ols)`, 解为 `pinv(diag(w) · B) · (w ⊙ log_s)`.
/// 两个输入均为自然对数值, 长度等于 B 的行数.
///
/// # 注意
///
/// 长度不一致时 panic; 由调用方保证.
pub fn solve_params(
    design: &Array2<f64>,
    log_ols: ArrayView1<f64>,
    log_s: ArrayView1<f64>,
) -> FitResult<Array1<f64>> {
    debug_assert_eq!(design.ncols(), DESIGN_COLS);
    assert_eq!(design.nrows(), log_ols.len(), "权重长度与设计矩阵行数不一致");
    assert_eq!(design.nrows(), log_s.len(), "信号长度与设计矩阵行数不一致");

    let w = log_ols.mapv(f64::exp);
    let weighted = design * &w.view().insert_axis(Axis(1));
    Ok(pinv(&weighted)?.dot(&(&w * &log_s)))
}

/// 单个体素的完整估计: 参数求解, 组装张量, 特征分解.
///
/// 返回特征分解结果, 张量本身与 `ln(S0)`.
pub fn fit_voxel(
    design: &Array2<f64>,
    log_ols: ArrayView1<f64>,
    log_s: ArrayView1<f64>,
) -> FitResult<(EigenResult, DiffusionTensor, f64)> {
    let params = solve_params(design, log_ols, log_s)?;
    let tensor = DiffusionTensor::from_components(params.view());
    let eig = decompose(&tensor)?;
    Ok((eig, tensor, params[LOG_S0]))
}
