//! 扩散张量及其特征分解.

use ndarray::{array, Array2, ArrayView1};

use crate::consts::{component::*, TENSOR_COMPONENTS};

mod eigen;
pub mod metrics;

pub use eigen::{decompose, EigenResult};

/// 3x3 对称扩散张量, 以六个独立分量表示.
///
/// 单位与 b 值的倒数一致 (b 以 s/mm^2 给出时, 分量为 mm^2/s, 量级约 1e-3).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DiffusionTensor {
    /// `Dxx`.
    pub xx: f64,

    /// `Dyy`.
    pub yy: f64,

    /// `Dzz`.
    pub zz: f64,

    /// `Dxy = Dyx`.
    pub xy: f64,

    /// `Dxz = Dzx`.
    pub xz: f64,

    /// `Dyz = Dzy`.
    pub yz: f64,
}

impl DiffusionTensor {
    /// 对角张量.
    #[inline]
    pub const fn diagonal(xx: f64, yy: f64, zz: f64) -> Self {
        Self {
            xx,
            yy,
            zz,
            xy: 0.0,
            xz: 0.0,
            yz: 0.0,
        }
    }

    /// 各向同性张量 `d · I`.
    #[inline]
    pub const fn isotropic(d: f64) -> Self {
        Self::diagonal(d, d, d)
    }

    /// 从 `(Dxx, Dyy, Dzz, Dxy, Dxz, Dyz)` 构建. 多余的分量 (例如截距) 被忽略.
    ///
    /// 当 `v.len() < 6` 时 panic.
    pub fn from_components(v: ArrayView1<f64>) -> Self {
        assert!(v.len() >= TENSOR_COMPONENTS, "张量至少需要 6 个分量");
        Self {
            xx: v[XX],
            yy: v[YY],
            zz: v[ZZ],
            xy: v[XY],
            xz: v[XZ],
            yz: v[YZ],
        }
    }

    /// `(Dxx, Dyy, Dzz, Dxy, Dxz, Dyz)`.
    #[inline]
    pub fn components(&self) -> [f64; TENSOR_COMPONENTS] {
        [self.xx, self.yy, self.zz, self.xy, self.xz, self.yz]
    }

    /// 生成完整的对称矩阵.
    pub fn to_matrix(&self) -> Array2<f64> {
        array![
            [self.xx, self.xy, self.xz],
            [self.xy, self.yy, self.yz],
            [self.xz, self.yz, self.zz],
        ]
    }

    /// 迹.
    #[inline]
    pub fn trace(&self) -> f64 {
        self.xx + self.yy + self.zz
    }

    /// 沿单位方向 `g` 的表观扩散系数 `g^T D g`.
    #[inline]
    pub fn along(&self, [x, y, z]: [f64; 3]) -> f64 {
        self.xx * x * x
            + self.yy * y * y
            + self.zz * z * z
            + 2.0 * (self.xy * x * y + self.xz * x * z + self.yz * y * z)
    }
}
