//! 线性代数辅助函数.

use ndarray::{s, Array2, ArrayBase, Axis, Data, Ix2};
use ndarray_linalg::SVD;

use crate::consts::PINV_RCOND;
use crate::{FitError, FitResult};

/// 基于 SVD 计算 Moore-Penrose 伪逆. 小于 `rcond * max(σ)` 的奇异值视为 0.
///
/// 对 `m x n` 的输入返回 `n x m` 的矩阵.
pub(crate) fn pinv<S>(a: &ArrayBase<S, Ix2>) -> FitResult<Array2<f64>>
where
    S: Data<Elem = f64>,
{
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return Ok(Array2::zeros((n, m)));
    }

    let (u, sigma, vt) = a.svd(true, true)?;
    let (u, vt) = u.zip(vt).ok_or(FitError::SingularVectors)?;

    let k = sigma.len();
    let cutoff = PINV_RCOND * sigma.iter().copied().fold(0.0, f64::max);
    let inv_sigma = sigma.mapv(|v| if v > cutoff { v.recip() } else { 0.0 });

    // pinv = V_k · diag(1/σ) · U_k^T
    let mut ut = u.slice(s![.., ..k]).t().to_owned();
    ut *= &inv_sigma.insert_axis(Axis(1));
    Ok(vt.slice(s![..k, ..]).t().dot(&ut))
}

/// 判断矩阵是否是对称的 (逐元素误差不超过 `tol`).
#[inline]
pub(crate) fn is_symmetric(a: &Array2<f64>, tol: f64) -> bool {
    a.is_square() && a.indexed_iter().all(|((i, j), v)| (v - a[(j, i)]).abs() <= tol)
}
