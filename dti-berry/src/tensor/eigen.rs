//! 张量特征分解.

use ndarray::ArrayView1;
use ndarray_linalg::{Eigh, UPLO};

use super::{metrics, DiffusionTensor};
use crate::consts::EIGEN_PACK_LEN;
use crate::linalg::is_symmetric;
use crate::{FitError, FitResult};

/// 排序并截断后的特征分解结果.
///
/// `values` 按降序排列且均非负, `vectors[k]` 是 `values[k]` 对应的单位特征向量.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EigenResult {
    /// 特征值 `λ1 >= λ2 >= λ3 >= 0`.
    pub values: [f64; 3],

    /// 与特征值一一对应的特征向量.
    pub vectors: [[f64; 3]; 3],
}

impl EigenResult {
    /// 全零结果. 未参与拟合的体素以此填充.
    pub const ZERO: EigenResult = EigenResult {
        values: [0.0; 3],
        vectors: [[0.0; 3]; 3],
    };

    /// 打包为 `[λ1, λ2, λ3, e1x, e1y, e1z, e2x, e2y, e2z, e3x, e3y, e3z]`,
    /// 所有分量均乘以 `scale`.
    pub fn pack(&self, scale: f64) -> [f64; EIGEN_PACK_LEN] {
        let mut ans = [0.0; EIGEN_PACK_LEN];
        ans[..3].copy_from_slice(&self.values);
        for (k, v) in self.vectors.iter().enumerate() {
            ans[3 + 3 * k..6 + 3 * k].copy_from_slice(v);
        }
        ans.iter_mut().for_each(|v| *v *= scale);
        ans
    }

    /// 从打包向量还原. 当长度不是 12 时 panic.
    pub fn unpack(v: ArrayView1<f64>) -> Self {
        assert_eq!(v.len(), EIGEN_PACK_LEN);
        let at = |i: usize| [v[i], v[i + 1], v[i + 2]];
        Self {
            values: at(0),
            vectors: [at(3), at(6), at(9)],
        }
    }

    /// 主方向 (最大特征值对应的特征向量).
    #[inline]
    pub fn principal(&self) -> [f64; 3] {
        self.vectors[0]
    }

    /// 表观扩散系数 (平均扩散率).
    #[inline]
    pub fn adc(&self) -> f64 {
        metrics::adc(&self.values)
    }

    /// 各向异性分数.
    #[inline]
    pub fn fa(&self) -> f64 {
        metrics::fa(&self.values)
    }
}

/// 对张量做特征分解, 然后:
///
/// 1. 按特征值降序重排特征向量. 特征值相等时保持 LAPACK 输出 (升序) 中的相对顺序;
/// 2. 将负特征值截断为 0.
///
/// 若分解没有得到恰好三个特征值, 返回 [`FitError::Decomposition`]
/// (其中的体素下标为 0, 由调用方重新定位).
pub fn decompose(tensor: &DiffusionTensor) -> FitResult<EigenResult> {
    let m = tensor.to_matrix();
    debug_assert!(is_symmetric(&m, 0.0));
    let (vals, vecs) = m.eigh(UPLO::Lower)?;
    if vals.len() != 3 || vecs.dim() != (3, 3) {
        return Err(FitError::Decomposition {
            voxel: 0,
            found: vals.len(),
        });
    }

    let mut order = [0usize, 1, 2];
    order.sort_by(|a, b| vals[*b].total_cmp(&vals[*a]));

    let mut ans = EigenResult::ZERO;
    for (k, &src) in order.iter().enumerate() {
        // 扩散率不可能为负, 负值来自噪声.
        ans.values[k] = vals[src].max(0.0);
        let c = vecs.column(src);
        ans.vectors[k] = [c[0], c[1], c[2]];
    }
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;

    fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_decompose_isotropic() {
        let d = 7e-4;
        let e = decompose(&DiffusionTensor::isotropic(d)).unwrap();
        for v in e.values {
            assert_relative_eq!(v, d, max_relative = 1e-10);
        }
        assert!(e.fa().abs() < 1e-8);
        assert_relative_eq!(e.adc(), d, max_relative = 1e-10);
    }

    #[test]
    fn test_decompose_anisotropic_diagonal() {
        let e = decompose(&DiffusionTensor::diagonal(5e-4, 2e-3, 5e-4)).unwrap();
        assert!(e.values[0] >= e.values[1] && e.values[1] >= e.values[2]);
        assert_relative_eq!(e.values[0], 2e-3, max_relative = 1e-10);
        assert_relative_eq!(e.values[1], 5e-4, max_relative = 1e-10);
        assert_relative_eq!(e.values[2], 5e-4, max_relative = 1e-10);

        // 主方向沿 y 轴, 其余两个向量张成 xz 平面.
        assert_relative_eq!(dot(e.principal(), [0.0, 1.0, 0.0]).abs(), 1.0, epsilon = 1e-10);
        for v in &e.vectors[1..] {
            assert!(v[1].abs() < 1e-10);
        }

        // FA 闭式解: l1 = 4 l, l2 = l3 = l.
        let (l1, l2) = (2e-3f64, 5e-4f64);
        let md = (l1 + 2.0 * l2) / 3.0;
        let expected = (1.5 * ((l1 - md).powi(2) + 2.0 * (l2 - md).powi(2))
            / (l1 * l1 + 2.0 * l2 * l2))
            .sqrt();
        assert_relative_eq!(e.fa(), expected, max_relative = 1e-6);
    }

    #[test]
    fn test_decompose_orthonormal_vectors() {
        let t = DiffusionTensor {
            xx: 1.7e-3,
            yy: 4e-4,
            zz: 3e-4,
            xy: 2e-4,
            xz: -1e-4,
            yz: 5e-5,
        };
        let e = decompose(&t).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(dot(e.vectors[i], e.vectors[j]), expected, epsilon = 1e-10);
            }
        }
        // D v = λ v
        let m = t.to_matrix();
        for k in 0..3 {
            let v = Array1::from(e.vectors[k].to_vec());
            let mv = m.dot(&v);
            for c in 0..3 {
                assert_relative_eq!(mv[c], e.values[k] * v[c], epsilon = 1e-12);
            }
        }
    }

    /// 负特征值被截断为精确的 0.
    #[test]
    fn test_decompose_clamps_negative() {
        let e = decompose(&DiffusionTensor::diagonal(1e-3, -2e-4, -5e-4)).unwrap();
        assert_relative_eq!(e.values[0], 1e-3, max_relative = 1e-10);
        assert_eq!(e.values[1], 0.0);
        assert_eq!(e.values[2], 0.0);
        // 截断后的 FA 仅由截断值计算: 单一非零特征值时 FA = 1.
        assert_relative_eq!(e.fa(), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_decompose_zero_tensor() {
        let e = decompose(&DiffusionTensor::isotropic(0.0)).unwrap();
        assert_eq!(e.values, [0.0; 3]);
        assert_eq!(e.fa(), 0.0);
        assert_eq!(e.adc(), 0.0);
    }

    #[test]
    fn test_pack_layout() {
        let e = decompose(&DiffusionTensor::diagonal(3e-3, 2e-3, 1e-3)).unwrap();
        let p = e.pack(1.0);
        assert_eq!(&p[..3], &e.values);
        assert_eq!(&p[3..6], &e.vectors[0]);
        assert_eq!(&p[9..], &e.vectors[2]);
        assert_eq!(EigenResult::unpack(ndarray::ArrayView1::from(&p)), e);

        let scaled = e.pack(1000.0);
        assert_relative_eq!(scaled[0], 3.0, max_relative = 1e-10);
    }
}
