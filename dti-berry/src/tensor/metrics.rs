//! 由特征值计算的标量指标.
//!
//! 参考: Basser, P., Pierpaoli, C., 1996. Microstructural and physiological features
//! of tissues elucidated by quantitative-diffusion-tensor MRI.

/// 表观扩散系数 (平均扩散率) `(λ1 + λ2 + λ3) / 3`.
#[inline]
pub fn adc(evals: &[f64; 3]) -> f64 {
    evals.iter().sum::<f64>() / 3.0
}

/// 各向异性分数
/// `sqrt(1.5 · Σ(λi - ADC)^2 / Σλi^2)`.
///
/// 特征值平方和为 0 (全零张量) 时定义为 0.
pub fn fa(evals: &[f64; 3]) -> f64 {
    let ss: f64 = evals.iter().map(|v| v * v).sum();
    if ss == 0.0 {
        return 0.0;
    }
    let md = adc(evals);
    let dev: f64 = evals.iter().map(|v| (v - md).powi(2)).sum();
    (1.5 * dev / ss).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adc() {
        assert_eq!(adc(&[3.0, 2.0, 1.0]), 2.0);
        assert_eq!(adc(&[0.0; 3]), 0.0);
    }

    #[test]
    fn test_fa_bounds() {
        assert_eq!(fa(&[0.0; 3]), 0.0);
        assert!(!fa(&[0.0; 3]).is_nan());
        assert!(fa(&[1e-3; 3]).abs() < 1e-12);
        assert!((fa(&[1e-3, 0.0, 0.0]) - 1.0).abs() < 1e-12);

        let v = fa(&[1.7e-3, 3e-4, 2e-4]);
        assert!(v > 0.0 && v < 1.0);
    }

    #[test]
    fn test_fa_closed_form() {
        // (2, 1, 0):
        // md = 1, dev = 2, ss = 5 -> sqrt(0.6).
        assert!((fa(&[2.0, 1.0, 0.0]) - 0.6f64.sqrt()).abs() < 1e-12);
    }
}
