//! 合成 DWI 体模.
//!
//! 球形区域内是方向随位置缓慢旋转的各向异性张量, 球外信号为 0 (由 mask 排除).
//! 信号按单张量模型无噪声生成.

use dti_berry::acquisition::{Acquisition, GradientTable};
use dti_berry::DiffusionTensor;
use ndarray::{Array1, Array4};

/// 体模的 b 值.
pub const PHANTOM_B: f64 = 1000.0;

/// 球内的 b0 信号.
pub const PHANTOM_S0: f64 = 1000.0;

/// 2 个 b0 加 `n` 个沿黄金螺旋分布在半球上的方向.
pub fn shell(n: usize, b: f64) -> Acquisition {
    let golden = std::f64::consts::PI * (3.0 - 5f64.sqrt());
    let dirs = (0..2).map(|_| [0.0; 3]).chain((0..n).map(|i| {
        let z = 1.0 - (i as f64 + 0.5) / n as f64;
        let r = (1.0 - z * z).sqrt();
        let t = golden * i as f64;
        [r * t.cos(), r * t.sin(), z]
    }));
    let bvals: Array1<f64> = (0..n + 2).map(|i| if i < 2 { 0.0 } else { b }).collect();
    Acquisition::new(GradientTable::from_directions(dirs), bvals)
}

/// 绕 z 轴旋转 `theta` 的柱状张量, 主方向在 xy 平面内.
fn fiber(theta: f64, l1: f64) -> DiffusionTensor {
    let (s, c) = theta.sin_cos();
    let l2 = 0.35e-3;
    DiffusionTensor {
        xx: l1 * c * c + l2 * s * s,
        yy: l1 * s * s + l2 * c * c,
        zz: l2,
        xy: (l1 - l2) * s * c,
        xz: 0.0,
        yz: 0.0,
    }
}

/// `side^3` 的体模, 使用 `n` 个梯度方向.
pub fn ball(side: usize, n: usize) -> (Array4<f32>, Acquisition) {
    let acq = shell(n, PHANTOM_B);
    let c = (side as f64 - 1.0) / 2.0;
    let r2 = c * c;
    let sig = Array4::from_shape_fn((side, side, side, acq.len()), |(i, j, k, g)| {
        let (x, y, z) = (i as f64 - c, j as f64 - c, k as f64 - c);
        if x * x + y * y + z * z > r2 {
            return 0.0;
        }
        let t = fiber(y.atan2(x), 1.1e-3 + 0.4e-3 * (z / c.max(1.0)).abs());
        let b = acq.bvals()[g];
        (PHANTOM_S0 * (-b * t.along(acq.gradients().direction(g))).exp()) as f32
    });
    (sig, acq)
}
