//! 对数信号与 OLS 加权估计.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::consts::{FIXED_POINT_FACTOR, SIGNAL_FLOOR};
use crate::linalg::pinv;
use crate::FitResult;

/// 定点模式下一次投影的行数, 用于限制临时 `f64` 矩阵的大小.
const PROJECT_ROWS: usize = 4096;

/// `V x g` 的对数信号, 以浮点或 `i16` 定点形式存储.
///
/// 定点形式保存的是 `ln(S) * 1000` 截断后的整数, 使用前需乘以 [`Self::scale`].
#[derive(Debug, Clone, PartialEq)]
pub enum LogSignal {
    /// 全精度.
    Float(Array2<f64>),

    /// 保留 3 位小数的定点数.
    Fixed(Array2<i16>),
}

/// 取对数前, 非正 (以及 NaN) 信号被替换为 1.
#[inline]
fn floored_ln(v: f32) -> f64 {
    let v = if v > 0.0 { v } else { SIGNAL_FLOOR };
    (v as f64).ln()
}

/// 单个体素原始信号的全精度对数, 规则与 [`LogSignal::from_signal`] 相同.
pub fn log_row(signal: ArrayView1<f32>) -> Array1<f64> {
    signal.mapv(floored_ln)
}

impl LogSignal {
    /// 对 `V x g` 的原始信号取对数. `fixed` 为 `true` 时以定点形式存储.
    pub fn from_signal(signal: ArrayView2<f32>, fixed: bool) -> Self {
        if fixed {
            Self::Fixed(signal.mapv(|v| (floored_ln(v) * FIXED_POINT_FACTOR) as i16))
        } else {
            Self::Float(signal.mapv(floored_ln))
        }
    }

    /// 存储值到自然对数值的缩放因子.
    #[inline]
    pub fn scale(&self) -> f64 {
        match self {
            Self::Float(_) => 1.0,
            Self::Fixed(_) => FIXED_POINT_FACTOR.recip(),
        }
    }

    /// `(V, g)`.
    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        match self {
            Self::Float(a) => a.dim(),
            Self::Fixed(a) => a.dim(),
        }
    }

    /// 是否以定点形式存储.
    #[inline]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }

    /// 第 `i` 个体素的对数信号 (已乘以缩放因子). 越界时 panic.
    pub fn row(&self, i: usize) -> Array1<f64> {
        match self {
            Self::Float(a) => a.row(i).to_owned(),
            Self::Fixed(a) => {
                let scale = self.scale();
                a.row(i).mapv(|v| v as f64 * scale)
            }
        }
    }

    /// 右乘 `g x g` 矩阵 `m`, 结果保持相同的存储形式.
    ///
    /// 定点形式的结果同样截断为 `i16`.
    pub fn project(&self, m: &Array2<f64>) -> Self {
        match self {
            Self::Float(a) => Self::Float(a.dot(m)),
            Self::Fixed(a) => {
                let mut ans = Array2::<i16>::zeros(a.dim());
                for (src, mut dst) in a
                    .axis_chunks_iter(Axis(0), PROJECT_ROWS)
                    .zip(ans.axis_chunks_iter_mut(Axis(0), PROJECT_ROWS))
                {
                    let proj = src.mapv(f64::from).dot(m);
                    dst.zip_mut_with(&proj, |d, p| *d = *p as i16);
                }
                Self::Fixed(ans)
            }
        }
    }
}

/// 帽子矩阵 `B · pinv(B)`, 即到 B 列空间的正交投影 (`g x g`).
pub fn hat_matrix(design: &Array2<f64>) -> FitResult<Array2<f64>> {
    Ok(design.dot(&pinv(design)?))
}

/// 所有体素一次性 OLS: `log_s_ols = log_s · B · pinv(B)`.
///
/// 结果只用作下一步 WLS 的权重, 并不是最终的张量估计.
/// WLS 的右端项总是由 [`log_row`] 从原始信号重新计算, 定点误差只影响权重.
pub fn ols_estimate(log_s: &LogSignal, design: &Array2<f64>) -> FitResult<LogSignal> {
    let hat = hat_matrix(design)?;
    Ok(log_s.project(&hat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_log_signal_floor() {
        let s = array![[0.0f32, -3.0, 1.0, std::f32::consts::E, f32::NAN]];
        let l = LogSignal::from_signal(s.view(), false);
        assert_eq!(l.row(0).to_vec()[..3], [0.0, 0.0, 0.0]);
        assert!((l.row(0)[3] - 1.0).abs() < 1e-6);
        assert_eq!(l.row(0)[4], 0.0);
        assert!(l.row(0).iter().all(|v| v.is_finite()));
        assert_eq!(log_row(s.row(0)), l.row(0));
    }

    #[test]
    fn test_log_signal_fixed() {
        let s = array![[1000.0f32, 10.0]];
        let l = LogSignal::from_signal(s.view(), true);
        assert!(l.is_fixed());
        assert_eq!(l.scale(), 1e-3);
        match &l {
            LogSignal::Fixed(a) => assert_eq!(a[(0, 0)], 6907),
            LogSignal::Float(_) => unreachable!(),
        }
        // 量化误差不超过 1e-3.
        assert!((l.row(0)[0] - 1000f64.ln()).abs() < 1e-3);
        assert!((l.row(0)[1] - 10f64.ln()).abs() < 1e-3);
    }

    /// 帽子矩阵是幂等的对称投影, 且保持列空间中的向量不变.
    #[test]
    fn test_hat_matrix_projection() {
        let b = array![
            [0.0, 1.0],
            [-1.0, 1.0],
            [-2.0, 1.0],
            [-3.0, 1.0],
        ];
        let h = hat_matrix(&b).unwrap();
        let hh = h.dot(&h);
        for (x, y) in h.iter().zip(hh.iter()) {
            assert!((x - y).abs() < 1e-10);
        }
        let y = b.dot(&array![0.5, 2.0]);
        let py = h.dot(&y);
        for (x, y) in py.iter().zip(y.iter()) {
            assert!((x - y).abs() < 1e-10);
        }
    }

    #[test]
    fn test_ols_estimate_fixed_tracks_float() {
        let b = array![
            [0.0, 1.0],
            [-1000.0, 1.0],
            [-2000.0, 1.0],
        ];
        let s = array![[900.0f32, 400.0, 150.0], [50.0, 40.0, 30.0]];
        let float = ols_estimate(&LogSignal::from_signal(s.view(), false), &b).unwrap();
        let fixed = ols_estimate(&LogSignal::from_signal(s.view(), true), &b).unwrap();
        for i in 0..2 {
            for (a, b) in float.row(i).iter().zip(fixed.row(i).iter()) {
                assert!((a - b).abs() < 5e-3);
            }
        }
    }
}
