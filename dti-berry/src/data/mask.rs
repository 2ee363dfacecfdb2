use std::ops::Index;

use ndarray::{Array3, ArrayBase, ArrayView3, ArrayView4, Axis, Data, Ix3};
use num::Zero;

use crate::Idx3d;

/// 体素 mask. `true` 代表该体素参与拟合.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    data: Array3<bool>,
}

impl Index<Idx3d> for Mask {
    type Output = bool;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl Mask {
    /// 从任意数值体数据构建 mask, 非零即参与拟合.
    pub fn from_volume<A, S>(vol: &ArrayBase<S, Ix3>) -> Self
    where
        A: Zero + Copy,
        S: Data<Elem = A>,
    {
        Self {
            data: vol.map(|v| !v.is_zero()),
        }
    }

    /// 直接由布尔数组构建.
    #[inline]
    pub fn from_bool(data: Array3<bool>) -> Self {
        Self { data }
    }

    /// 全部体素都参与拟合.
    #[inline]
    pub fn full(shape: Idx3d) -> Self {
        Self {
            data: Array3::from_elem(shape, true),
        }
    }

    /// 对 b0 图像做阈值: 值不小于 `threshold` 且为正的体素参与拟合.
    pub fn from_b0(b0: ArrayView3<f32>, threshold: f64) -> Self {
        Self {
            data: b0.map(|v| {
                let v = *v as f64;
                v >= threshold && v > 0.0
            }),
        }
    }

    /// 对 4D 信号的第一个通道 (通常是 b0) 做阈值, 见 [`Self::from_b0`].
    ///
    /// 当信号没有任何通道时 panic.
    #[inline]
    pub fn from_signal(signal: ArrayView4<f32>, threshold: f64) -> Self {
        Self::from_b0(signal.index_axis(Axis(3), 0), threshold)
    }

    /// 空间形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 参与拟合的体素个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|v| **v).count()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, bool> {
        self.data.view()
    }
}
