//! 合成体模. 信号按单张量模型无噪声生成: `S = S0 · exp(-b · g^T D g)`.

#![allow(dead_code)]

use dti_berry::acquisition::{Acquisition, GradientTable};
use dti_berry::{DiffusionTensor, Idx3d};
use ndarray::{Array1, Array4};

/// 初始化日志. 多个测试重复调用时只有第一次生效.
pub fn init_logger() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .init();
}

/// 1 个 b0 加 6 个非共面方向, 刚好确定 7 个参数.
pub fn acquisition_g7(b: f64) -> Acquisition {
    let s = std::f64::consts::FRAC_1_SQRT_2;
    let g = GradientTable::from_directions([
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [s, s, 0.0],
        [s, 0.0, s],
        [0.0, s, s],
    ]);
    let mut bvals = Array1::from_elem(7, b);
    bvals[0] = 0.0;
    Acquisition::new(g, bvals)
}

/// 2 个 b0 加 `n` 个沿黄金螺旋分布在半球上的方向.
pub fn acquisition_shell(n: usize, b: f64) -> Acquisition {
    let golden = std::f64::consts::PI * (3.0 - 5f64.sqrt());
    let dirs = (0..2).map(|_| [0.0; 3]).chain((0..n).map(|i| {
        let z = 1.0 - (i as f64 + 0.5) / n as f64;
        let r = (1.0 - z * z).sqrt();
        let t = golden * i as f64;
        [r * t.cos(), r * t.sin(), z]
    }));
    let g = GradientTable::from_directions(dirs);
    let bvals = (0..n + 2).map(|i| if i < 2 { 0.0 } else { b }).collect();
    Acquisition::new(g, bvals)
}

/// `R · diag(l) · R^T`, `R` 为先绕 z 轴转 `theta`, 再绕 x 轴转 `phi`.
pub fn rotated_tensor(l: [f64; 3], theta: f64, phi: f64) -> DiffusionTensor {
    let (st, ct) = theta.sin_cos();
    let (sp, cp) = phi.sin_cos();
    let rz = [[ct, -st, 0.0], [st, ct, 0.0], [0.0, 0.0, 1.0]];
    let rx = [[1.0, 0.0, 0.0], [0.0, cp, -sp], [0.0, sp, cp]];
    let mut r = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            r[i][j] = (0..3).map(|k| rx[i][k] * rz[k][j]).sum();
        }
    }
    let d = |i: usize, j: usize| (0..3).map(|k| r[i][k] * l[k] * r[j][k]).sum::<f64>();
    DiffusionTensor {
        xx: d(0, 0),
        yy: d(1, 1),
        zz: d(2, 2),
        xy: d(0, 1),
        xz: d(0, 2),
        yz: d(1, 2),
    }
}

/// 单个体素的无噪声信号.
pub fn voxel_signal(acq: &Acquisition, tensor: &DiffusionTensor, s0: f64) -> Vec<f32> {
    acq.bvals()
        .iter()
        .enumerate()
        .map(|(i, b)| (s0 * (-b * tensor.along(acq.gradients().direction(i))).exp()) as f32)
        .collect()
}

/// 由 `f` 逐体素生成 `(X, Y, Z, g)` 的信号. `f` 返回 `None` 的体素信号全为 0.
pub fn phantom<F>(acq: &Acquisition, shape: Idx3d, f: F) -> Array4<f32>
where
    F: Fn(Idx3d) -> Option<(DiffusionTensor, f64)>,
{
    let (x, y, z) = shape;
    let mut ans = Array4::<f32>::zeros((x, y, z, acq.len()));
    for ((i, j, k, c), v) in ans.indexed_iter_mut() {
        if let Some((t, s0)) = f((i, j, k)) {
            *v = voxel_signal(acq, &t, s0)[c];
        }
    }
    ans
}

/// 体模中每个体素的张量: 球形区域内为各向异性张量, 方向随位置变化; 其余为背景.
pub fn ball((i, j, k): Idx3d, radius: f64) -> Option<(DiffusionTensor, f64)> {
    let c = radius;
    let r2 = (i as f64 - c).powi(2) + (j as f64 - c).powi(2) + (k as f64 - c).powi(2);
    if r2 > radius * radius {
        return None;
    }
    let theta = 0.3 * i as f64 + 0.1 * k as f64;
    let phi = 0.2 * j as f64;
    let l1 = 1.2e-3 + 1e-4 * k as f64;
    Some((rotated_tensor([l1, 0.4e-3, 0.25e-3], theta, phi), 800.0 + 10.0 * i as f64))
}

/// 降序排列的真实特征值.
pub fn sorted_evals(l: [f64; 3]) -> [f64; 3] {
    let mut l = l;
    l.sort_by(|a, b| b.total_cmp(a));
    l
}
